// ABOUTME: Record types shared between the bot core and the internal config API.
// ABOUTME: Members, channels, daily meeting configs, and predefined replies.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A standup participant registered in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "teamId", default)]
    pub team_id: String,
}

/// A channel or group where the bot runs standups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "teamId", default)]
    pub team_id: String,
}

/// Per-channel standup schedule, one per channel.
///
/// `last_daily` is bumped when a round completes; the scheduler uses it as a
/// cooldown so the same day never fires twice. `limit_time` is the optional
/// flexible cutoff: between `start_time` and `limit_time` the round only
/// launches once the team-availability check passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMeeting {
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "lastDaily")]
    pub last_daily: Option<DateTime<Utc>>,
    #[serde(rename = "startTime")]
    pub start_time: NaiveTime,
    #[serde(rename = "limitTime")]
    pub limit_time: Option<NaiveTime>,
    pub days: Vec<Weekday>,
}

/// An automated reply matched against standup answers.
///
/// `question` indexes the three standup questions (0 = yesterday, 1 = today,
/// 2 = impediments). The rule fires when `pattern` matching the answer text
/// equals `match_on_hit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredefinedReply {
    #[serde(rename = "channelId")]
    pub channel_id: String,
    pub question: u8,
    pub reply: String,
    #[serde(rename = "regularExpression")]
    pub pattern: String,
    #[serde(rename = "matchOnHit")]
    pub match_on_hit: bool,
}
