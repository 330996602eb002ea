// ABOUTME: Config store seam — persistence boundary for channels, members, schedules, replies.
// ABOUTME: Typed error split (not-found vs failure) plus MemoryStore for tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ChannelRecord, DailyMeeting, Member, PredefinedReply};

/// Errors from the persistence boundary. Not-found is a distinct
/// recoverable condition with its own user-facing message; everything else
/// collapses into the generic failure the dialogues abort on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("config store request failed: {0}")]
    Failed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD boundary consumed by the dialogue engine and the scheduler.
/// Implemented over HTTP by `ApiClient` and in memory by `MemoryStore`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Create-if-not-exists; calling twice for the same channel succeeds
    /// without duplicating anything.
    async fn create_channel(&self, channel: &ChannelRecord) -> StoreResult<()>;

    async fn add_member(&self, member: &Member) -> StoreResult<()>;

    /// Remove a member; `StoreError::NotFound` when no such member exists
    /// in the channel.
    async fn delete_member(&self, channel_id: &str, member_id: &str) -> StoreResult<()>;

    /// Members of a channel, in storage iteration order.
    async fn list_members(&self, channel_id: &str) -> StoreResult<Vec<Member>>;

    /// Upsert the channel's schedule.
    async fn put_daily_meeting(&self, meeting: &DailyMeeting) -> StoreResult<()>;

    async fn list_daily_meetings(&self) -> StoreResult<Vec<DailyMeeting>>;

    async fn add_reply(&self, reply: &PredefinedReply) -> StoreResult<()>;

    /// Predefined replies of a channel, in storage iteration order.
    async fn list_replies(&self, channel_id: &str) -> StoreResult<Vec<PredefinedReply>>;

    /// Remove all reply rules for a (channel, question) pair, returning how
    /// many were removed.
    async fn delete_replies(&self, channel_id: &str, question: u8) -> StoreResult<usize>;

    /// The schedule for one channel, if configured.
    async fn get_daily_meeting(&self, channel_id: &str) -> StoreResult<Option<DailyMeeting>> {
        let meetings = self.list_daily_meetings().await?;
        Ok(meetings.into_iter().find(|m| m.channel_id == channel_id))
    }
}

// =============================================================================
// In-memory implementation for testing
// =============================================================================

use std::sync::Mutex;

#[derive(Default)]
struct MemoryInner {
    channels: Vec<ChannelRecord>,
    members: Vec<Member>,
    meetings: Vec<DailyMeeting>,
    replies: Vec<PredefinedReply>,
    failing: bool,
}

/// In-memory config store for testing dialogues and the scheduler without
/// the API server. Insertion order doubles as storage iteration order.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, to exercise the generic-failure
    /// paths in dialogues.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    pub fn channel_count(&self) -> usize {
        self.inner.lock().unwrap().channels.len()
    }

    fn check(&self, inner: &MemoryInner) -> StoreResult<()> {
        if inner.failing {
            Err(StoreError::Failed("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn create_channel(&self, channel: &ChannelRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        if !inner.channels.iter().any(|c| c.id == channel.id) {
            inner.channels.push(channel.clone());
        }
        Ok(())
    }

    async fn add_member(&self, member: &Member) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        inner.members.push(member.clone());
        Ok(())
    }

    async fn delete_member(&self, channel_id: &str, member_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        let before = inner.members.len();
        inner
            .members
            .retain(|m| !(m.channel_id == channel_id && m.id == member_id));
        if inner.members.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_members(&self, channel_id: &str) -> StoreResult<Vec<Member>> {
        let inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        Ok(inner
            .members
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn put_daily_meeting(&self, meeting: &DailyMeeting) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        inner.meetings.retain(|m| m.channel_id != meeting.channel_id);
        inner.meetings.push(meeting.clone());
        Ok(())
    }

    async fn list_daily_meetings(&self) -> StoreResult<Vec<DailyMeeting>> {
        let inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        Ok(inner.meetings.clone())
    }

    async fn add_reply(&self, reply: &PredefinedReply) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        inner.replies.push(reply.clone());
        Ok(())
    }

    async fn list_replies(&self, channel_id: &str) -> StoreResult<Vec<PredefinedReply>> {
        let inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        Ok(inner
            .replies
            .iter()
            .filter(|r| r.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn delete_replies(&self, channel_id: &str, question: u8) -> StoreResult<usize> {
        let mut inner = self.inner.lock().unwrap();
        self.check(&inner)?;
        let before = inner.replies.len();
        inner
            .replies
            .retain(|r| !(r.channel_id == channel_id && r.question == question));
        Ok(before - inner.replies.len())
    }
}
