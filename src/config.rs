// ABOUTME: Configuration parsing from TOML file with environment variable overrides.
// ABOUTME: Validates required fields and provides sensible defaults for optional ones.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default)]
    pub team_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

fn default_bot_name() -> String {
    "dailybot".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "dailybot.db".to_string()
}

fn default_tick_secs() -> u64 {
    60
}

fn default_cooldown_hours() -> i64 {
    12
}

fn default_ready_timeout_secs() -> u64 {
    120
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            bot_name: default_bot_name(),
            team_id: String::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            db_path: default_db_path(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            cooldown_hours: default_cooldown_hours(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(config_path: &str) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path))?
        } else {
            Config::default()
        };

        if let Ok(val) = std::env::var("SLACK_TOKEN") {
            config.slack.token = val;
        }
        if let Ok(val) = std::env::var("SLACK_BOT_NAME") {
            config.slack.bot_name = val;
        }
        if let Ok(val) = std::env::var("SLACK_TEAM_ID") {
            config.slack.team_id = val;
        }
        if let Ok(val) = std::env::var("API_BASE_URL") {
            config.api.base_url = val;
        }
        if let Ok(val) = std::env::var("SERVER_HOST") {
            config.server.host = val;
        }
        if let Ok(val) = std::env::var("SERVER_PORT") {
            config.server.port = val.parse().context("SERVER_PORT is not a valid port")?;
        }
        if let Ok(val) = std::env::var("SERVER_DB_PATH") {
            config.server.db_path = val;
        }

        Ok(config)
    }

    /// Checks required for running the bot; the API server does not need
    /// Slack credentials, so it calls `validate_server` instead.
    pub fn validate_bot(&self) -> Result<()> {
        if self.slack.token.is_empty() {
            bail!("slack.token is required (or set SLACK_TOKEN)");
        }
        if self.scheduler.tick_secs == 0 {
            bail!("scheduler.tick_secs must be greater than zero");
        }
        if self.scheduler.cooldown_hours <= 0 {
            bail!("scheduler.cooldown_hours must be greater than zero");
        }
        Ok(())
    }

    pub fn validate_server(&self) -> Result<()> {
        if self.server.db_path.is_empty() {
            bail!("server.db_path must not be empty");
        }
        Ok(())
    }
}
