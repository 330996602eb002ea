// ABOUTME: Dialogue engine — multi-turn scripted exchanges driven by correlated replies.
// ABOUTME: Shared context, prompt/await helpers, and the stateless hello/help dialogues.

pub mod members;
pub mod replies;
pub mod schedule;
pub mod standup;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::correlation::Registry;
use crate::event::reply_payload;
use crate::scheduler::ScheduleCache;
use crate::store::ConfigStore;
use crate::transport::ChatTransport;
use crate::types::ChannelRecord;

/// Sent when a config store call fails mid-dialogue; the dialogue aborts
/// with no retry.
pub const GENERIC_FAILURE: &str =
    "Ups, something unexpected happened. Please try again later or contact support.";

pub const NONE_REGISTERED: &str = "There are no members registered yet. \
    Type `daily add member @username` to add the first one";

const WELCOME: &str = "Hello team! I'm here to help you with your daily meetings. \
    To add members type `daily add member @username`, to set up the meeting time \
    type `daily schedule`.\nIf you need help, just type `help`";

const HELP: &str = "These are the commands I understand:\n\
    `hello` — introduce me to the channel\n\
    `daily add member` / `daily delete member` — manage participants\n\
    `daily list` — show registered participants\n\
    `daily schedule` — set the meeting days and time\n\
    `daily info` — show the current schedule\n\
    `daily start` — run the standup now\n\
    `daily resume @username` — re-run the questions for one member\n\
    `daily add reply` / `daily delete reply` — manage automated replies\n\
    Type `cancel` at any question to stop a dialogue.";

/// Everything a dialogue run needs, explicitly passed — no state is ever
/// inferred from a shared "current channel" variable.
pub struct DialogueContext {
    pub bot_id: String,
    pub bot_name: String,
    pub team_id: String,
    pub transport: Arc<dyn ChatTransport>,
    pub store: Arc<dyn ConfigStore>,
    pub registry: Arc<Registry>,
    pub schedule_cache: ScheduleCache,
    /// Bounded wait for the standup readiness check.
    pub ready_timeout: Duration,
}

/// Outcome of one awaited dialogue step.
pub enum Step {
    /// A reply arrived; payload has the bot address prefix stripped.
    Reply(String),
    /// The participant typed the cancellation keyword.
    Cancelled,
    /// The bounded wait elapsed (readiness check only).
    TimedOut,
}

impl DialogueContext {
    /// Best-effort send: a failed outbound send is logged and skipped, the
    /// dialogue carries on.
    pub async fn say(&self, channel_id: &str, text: &str) {
        if let Err(e) = self.transport.send(channel_id, text).await {
            tracing::warn!(channel = %channel_id, error = %e, "Failed to send message");
        }
    }

    /// Surface the generic failure message for an aborted dialogue.
    pub async fn fail(&self, channel_id: &str) {
        self.say(channel_id, GENERIC_FAILURE).await;
    }

    /// Register the correlation, send the prompt, and wait (unbounded) for
    /// the next reply from `participant` in `channel`. The registration is
    /// released on every exit path.
    pub async fn ask(&self, channel_id: &str, participant: &str, prompt: &str) -> Result<Step> {
        let handle = self.registry.await_reply(channel_id, participant)?;
        self.say(channel_id, prompt).await;
        let event = handle.recv().await?;
        Ok(self.step_from(&event.text))
    }

    /// Like `ask`, but bounded: the wait races a timer.
    pub async fn ask_timeout(
        &self,
        channel_id: &str,
        participant: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Step> {
        let handle = self.registry.await_reply(channel_id, participant)?;
        self.say(channel_id, prompt).await;
        match handle.recv_timeout(timeout).await? {
            Some(event) => Ok(self.step_from(&event.text)),
            None => Ok(Step::TimedOut),
        }
    }

    fn step_from(&self, text: &str) -> Step {
        let payload = reply_payload(text, &self.bot_id, &self.bot_name);
        if crate::parse::is_cancel(payload) {
            Step::Cancelled
        } else {
            Step::Reply(payload.to_string())
        }
    }
}

/// `hello`: provision the channel record (create-if-not-exists) and greet.
/// Saying hello twice neither errors nor duplicates storage.
pub async fn hello(ctx: &DialogueContext, channel_id: &str) {
    let record = ChannelRecord {
        id: channel_id.to_string(),
        name: String::new(),
        team_id: ctx.team_id.clone(),
    };
    if let Err(e) = ctx.store.create_channel(&record).await {
        tracing::error!(channel = %channel_id, error = %e, "Failed to store channel");
        ctx.fail(channel_id).await;
        return;
    }
    ctx.say(channel_id, WELCOME).await;
}

/// `help`: static usage text.
pub async fn help(ctx: &DialogueContext, channel_id: &str) {
    ctx.say(channel_id, HELP).await;
}

/// Reaction to bot-addressed text that matches no command and no pending
/// correlation.
pub async fn not_understood(ctx: &DialogueContext, channel_id: &str) {
    ctx.say(channel_id, ":interrobang:").await;
}
