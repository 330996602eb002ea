// ABOUTME: Standup scheduler — periodic evaluation of cached schedules, spawning due rounds.
// ABOUTME: Holds the in-memory DailyMeeting cache that every schedule write keeps in sync.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveTime, Timelike, Utc, Weekday};
use chrono::Datelike;
use tokio::time::interval;

use crate::dialogue::{standup, DialogueContext};
use crate::types::DailyMeeting;

/// Injectable team-availability predicate gating flexible starts. The
/// reference stubs this to always-true; it stays an explicit extension
/// point rather than guessed logic.
pub type AvailabilityCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub fn always_available() -> AvailabilityCheck {
    Arc::new(|_| true)
}

/// In-memory copy of every channel's schedule. Loaded once at startup and
/// updated by every write before the write returns, so the cache and the
/// config store converge after each mutation; the cache is the copy the
/// tick loop evaluates.
#[derive(Clone, Default)]
pub struct ScheduleCache {
    inner: Arc<RwLock<HashMap<String, DailyMeeting>>>,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, channel_id: &str) -> Option<DailyMeeting> {
        self.inner
            .read()
            .expect("schedule cache poisoned")
            .get(channel_id)
            .cloned()
    }

    pub fn upsert(&self, meeting: DailyMeeting) {
        self.inner
            .write()
            .expect("schedule cache poisoned")
            .insert(meeting.channel_id.clone(), meeting);
    }

    pub fn load(&self, meetings: Vec<DailyMeeting>) {
        let mut map = self.inner.write().expect("schedule cache poisoned");
        map.clear();
        for meeting in meetings {
            map.insert(meeting.channel_id.clone(), meeting);
        }
    }

    pub fn snapshot(&self) -> Vec<DailyMeeting> {
        self.inner
            .read()
            .expect("schedule cache poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("schedule cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a channel's standup should auto-launch at this instant.
///
/// Skips, in order: the post-round cooldown, a weekday outside the
/// configured set, a time-of-day before the start, and — when a flexible
/// limit is set and not yet reached — an unavailable team. Once the limit
/// passes the round fires regardless of availability.
pub fn should_fire(
    meeting: &DailyMeeting,
    now: DateTime<Utc>,
    weekday: Weekday,
    time_of_day: NaiveTime,
    cooldown: Duration,
    available: bool,
) -> bool {
    if let Some(last) = meeting.last_daily {
        if now - last < cooldown {
            return false;
        }
    }
    if !meeting.days.contains(&weekday) {
        return false;
    }
    if time_of_day < meeting.start_time {
        return false;
    }
    if let Some(limit) = meeting.limit_time {
        if time_of_day < limit && !available {
            return false;
        }
    }
    true
}

/// Run the scheduler loop. Loads the cache from the config store, then
/// evaluates every cached schedule each tick, spawning one task per due
/// round. Spawned rounds are never joined; a round outliving the tick
/// interval must not re-fire, so channels with an in-flight spawned round
/// are skipped until that round's task finishes.
pub async fn start_scheduler(
    ctx: Arc<DialogueContext>,
    tick: StdDuration,
    cooldown: Duration,
    availability: AvailabilityCheck,
) {
    match ctx.store.list_daily_meetings().await {
        Ok(meetings) => {
            let count = meetings.len();
            ctx.schedule_cache.load(meetings);
            tracing::info!(count, "Loaded daily meeting configs into scheduler cache");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load daily meetings — starting with empty cache");
        }
    }

    let running: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let mut ticker = interval(tick);
    tracing::info!(tick_secs = tick.as_secs(), "Starting standup scheduler");

    loop {
        ticker.tick().await;

        let now = Utc::now();
        let local = Local::now();
        let time_of_day = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())
            .unwrap_or(NaiveTime::MIN);

        for meeting in ctx.schedule_cache.snapshot() {
            let channel_id = meeting.channel_id.clone();
            let available = availability(&channel_id);

            if !should_fire(&meeting, now, local.weekday(), time_of_day, cooldown, available) {
                continue;
            }
            {
                let mut guard = running.lock().expect("running set poisoned");
                if !guard.insert(channel_id.clone()) {
                    tracing::debug!(channel = %channel_id, "Round still in flight, skipping tick");
                    continue;
                }
            }

            tracing::info!(channel = %channel_id, "Launching scheduled standup round");
            let round_ctx = Arc::clone(&ctx);
            let round_running = Arc::clone(&running);
            // One channel's round must not block evaluation of the others.
            tokio::spawn(async move {
                if let Err(e) = standup::run_round(&round_ctx, &channel_id).await {
                    tracing::error!(channel = %channel_id, error = %e, "Scheduled standup round failed");
                }
                round_running
                    .lock()
                    .expect("running set poisoned")
                    .remove(&channel_id);
            });
        }
    }
}
