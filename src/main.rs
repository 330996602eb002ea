// ABOUTME: Main entry point — `bot` runs the Slack facilitator, `apiserver` the config API.
// ABOUTME: Initializes logging, config, the RTM connection, the scheduler, and the receive loop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailybot::apiclient::ApiClient;
use dailybot::config::Config;
use dailybot::correlation::Registry;
use dailybot::dialogue::DialogueContext;
use dailybot::scheduler::{self, ScheduleCache};
use dailybot::slack::SlackConnection;
use dailybot::storage::Storage;
use dailybot::{router, server};

#[derive(Parser)]
#[command(name = "dailybot", about = "Daily standup facilitator bot")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to Slack and facilitate standups
    Bot,
    /// Serve the config storage HTTP API
    Apiserver,
}

#[tokio::main]
async fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\nPANIC! Bot crashed with the following error:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;

    match cli.command {
        Command::Bot => run_bot(config).await,
        Command::Apiserver => run_apiserver(config).await,
    }
}

async fn run_bot(config: Config) -> Result<()> {
    config.validate_bot()?;

    tracing::info!(
        bot_name = %config.slack.bot_name,
        api_base_url = %config.api.base_url,
        tick_secs = config.scheduler.tick_secs,
        "Starting standup bot"
    );

    let mut connection = SlackConnection::connect(&config.slack.token).await?;
    let store = Arc::new(ApiClient::new(&config.api.base_url));

    let ctx = Arc::new(DialogueContext {
        bot_id: connection.bot_id.clone(),
        bot_name: config.slack.bot_name.clone(),
        team_id: config.slack.team_id.clone(),
        transport: connection.transport.clone(),
        store,
        registry: Arc::new(Registry::new()),
        schedule_cache: ScheduleCache::new(),
        ready_timeout: Duration::from_secs(config.scheduler.ready_timeout_secs),
    });

    tokio::spawn(scheduler::start_scheduler(
        Arc::clone(&ctx),
        Duration::from_secs(config.scheduler.tick_secs),
        chrono::Duration::hours(config.scheduler.cooldown_hours),
        scheduler::always_available(),
    ));

    tracing::info!(bot_id = %ctx.bot_id, "Bot ready, draining RTM events");

    // One spawned task per event so a running dialogue never blocks the
    // receive loop or event delivery to other waiters.
    while let Some(event) = connection.next_event().await? {
        let event_ctx = Arc::clone(&ctx);
        tokio::spawn(router::dispatch(event_ctx, event));
    }

    tracing::info!("RTM stream closed, shutting down");
    Ok(())
}

async fn run_apiserver(config: Config) -> Result<()> {
    config.validate_server()?;

    let storage = Arc::new(Storage::open(&PathBuf::from(&config.server.db_path))?);
    tracing::info!(db_path = %config.server.db_path, "Storage initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server host/port")?;
    server::serve(storage, addr).await
}
