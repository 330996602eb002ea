// ABOUTME: Schedule dialogue — days, start time, optional flexible limit — plus `daily info`.
// ABOUTME: A config is only persisted once valid; writes hit the store and the scheduler cache.

use anyhow::Result;
use chrono::Weekday;

use super::{DialogueContext, Step};
use crate::parse::{extract_time, extract_weekdays, is_affirmative, is_negative};
use crate::types::DailyMeeting;

/// `daily schedule`: walk days → start time → flexible? → limit time.
pub async fn schedule(ctx: &DialogueContext, channel_id: &str, participant: &str) -> Result<()> {
    // Days
    let mut prompt = "Which days should the daily meeting run? \
        Weekday names, `weekdays` or `everyday` work."
        .to_string();
    let days = loop {
        match ctx.ask(channel_id, participant, &prompt).await? {
            Step::Cancelled => return cancelled(ctx, channel_id).await,
            Step::Reply(text) => {
                let days = extract_weekdays(&text);
                if !days.is_empty() {
                    break days;
                }
                prompt =
                    "I couldn't find any day in there. Try `monday wednesday`, `weekdays` or `everyday`."
                        .to_string();
            }
            Step::TimedOut => unreachable!("schedule waits are unbounded"),
        }
    };

    // Start time
    let mut prompt = "At what time should it start? Something like `9:00` or `10:30AM`.".to_string();
    let start_time = loop {
        match ctx.ask(channel_id, participant, &prompt).await? {
            Step::Cancelled => return cancelled(ctx, channel_id).await,
            Step::Reply(text) => {
                if let Some(time) = extract_time(&text) {
                    break time;
                }
                prompt = "That doesn't look like a time. Use `H:MM`, optionally with AM/PM."
                    .to_string();
            }
            Step::TimedOut => unreachable!("schedule waits are unbounded"),
        }
    };

    // Flexible cutoff?
    let mut prompt = "Should the start be flexible, waiting until the team is available? \
        Type `yes` or `no`."
        .to_string();
    let flexible = loop {
        match ctx.ask(channel_id, participant, &prompt).await? {
            Step::Cancelled => return cancelled(ctx, channel_id).await,
            Step::Reply(text) => {
                if is_affirmative(&text) {
                    break true;
                }
                if is_negative(&text) {
                    break false;
                }
                prompt = "Please answer `yes` or `no`.".to_string();
            }
            Step::TimedOut => unreachable!("schedule waits are unbounded"),
        }
    };

    let limit_time = if flexible {
        let mut prompt = "Until what time can the meeting wait?".to_string();
        loop {
            match ctx.ask(channel_id, participant, &prompt).await? {
                Step::Cancelled => return cancelled(ctx, channel_id).await,
                Step::Reply(text) => match extract_time(&text) {
                    // The limit must not come before the start, or the
                    // window would be empty.
                    Some(limit) if limit >= start_time => break Some(limit),
                    Some(_) => {
                        prompt = format!(
                            "The limit has to be at {} or later, otherwise there is no window \
                             to wait in. Try again.",
                            start_time.format("%H:%M")
                        );
                    }
                    None => {
                        prompt = "That doesn't look like a time. Use `H:MM`, optionally with AM/PM."
                            .to_string();
                    }
                },
                Step::TimedOut => unreachable!("schedule waits are unbounded"),
            }
        }
    } else {
        None
    };

    // A rescheduled channel keeps its cooldown timestamp.
    let last_daily = ctx
        .schedule_cache
        .get(channel_id)
        .and_then(|m| m.last_daily);

    let meeting = DailyMeeting {
        channel_id: channel_id.to_string(),
        last_daily,
        start_time,
        limit_time,
        days,
    };

    if let Err(e) = ctx.store.put_daily_meeting(&meeting).await {
        tracing::error!(channel = %channel_id, error = %e, "Failed to store daily meeting");
        ctx.fail(channel_id).await;
        return Ok(());
    }
    ctx.schedule_cache.upsert(meeting.clone());

    ctx.say(channel_id, &format!("Got it! {}", render(&meeting)))
        .await;
    Ok(())
}

/// `daily info`: render the channel's schedule.
pub async fn info(ctx: &DialogueContext, channel_id: &str) -> Result<()> {
    match ctx.schedule_cache.get(channel_id) {
        Some(meeting) => ctx.say(channel_id, &render(&meeting)).await,
        None => {
            ctx.say(
                channel_id,
                "There is no daily meeting scheduled for this channel yet. \
                 Type `daily schedule` to set one up.",
            )
            .await
        }
    }
    Ok(())
}

async fn cancelled(ctx: &DialogueContext, channel_id: &str) -> Result<()> {
    ctx.say(channel_id, "Ok, schedule unchanged.").await;
    Ok(())
}

fn render(meeting: &DailyMeeting) -> String {
    let days: Vec<&str> = meeting.days.iter().map(|d| day_name(*d)).collect();
    let mut text = format!(
        "Daily Meeting scheduled on {} at {}",
        days.join(", "),
        meeting.start_time.format("%H:%M")
    );
    if let Some(limit) = meeting.limit_time {
        text.push_str(&format!(", flexible until {}", limit.format("%H:%M")));
    }
    text
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
