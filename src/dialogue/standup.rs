// ABOUTME: The standup round — readiness check, three questions per member, predefined replies.
// ABOUTME: Also `daily resume`, which re-runs the questions for a single member.

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use tokio::time::Instant;

use super::{DialogueContext, Step, NONE_REGISTERED};
use crate::event::mention;
use crate::parse::{extract_mentions, is_affirmative, is_negative};
use crate::types::{Member, PredefinedReply};

const QUESTIONS: [&str; 3] = [
    "what did you do yesterday?",
    "what will you do today?",
    "are there any impediments in your way?",
];

enum Flow {
    Continue,
    Cancelled,
}

/// `daily start` (and scheduler-launched rounds): iterate the channel's
/// members in store order, run the readiness check and the three questions
/// for each, then close the round and stamp the schedule's cooldown.
pub async fn run_round(ctx: &DialogueContext, channel_id: &str) -> Result<()> {
    let members = match ctx.store.list_members(channel_id).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(channel = %channel_id, error = %e, "Failed to list members for standup");
            ctx.fail(channel_id).await;
            return Ok(());
        }
    };

    if members.is_empty() {
        ctx.say(channel_id, NONE_REGISTERED).await;
        return Ok(());
    }

    let rules = match ctx.store.list_replies(channel_id).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(channel = %channel_id, error = %e, "Failed to list predefined replies");
            ctx.fail(channel_id).await;
            return Ok(());
        }
    };

    ctx.say(channel_id, "Hi @everyone! Let's start the Daily Meeting :mega:")
        .await;

    for member in &members {
        match readiness_check(ctx, channel_id, member).await? {
            Readiness::Ready => {
                if let Flow::Cancelled = ask_questions(ctx, channel_id, member, &rules).await? {
                    ctx.say(channel_id, "Daily Meeting cancelled.").await;
                    return Ok(());
                }
            }
            // Timeout and an explicit "no" take the same path: the member
            // can catch up later, the round moves on.
            Readiness::NotAvailable => {
                ctx.say(
                    channel_id,
                    &format!(
                        "Ok {}, you can do it later — just type `daily resume {}` \
                         before the end of the day",
                        member.name, member.name
                    ),
                )
                .await;
            }
            Readiness::Cancelled => {
                ctx.say(channel_id, "Daily Meeting cancelled.").await;
                return Ok(());
            }
        }
    }

    ctx.say(channel_id, "Daily Meeting done :tada: Have a great day!")
        .await;

    mark_round_complete(ctx, channel_id).await;
    Ok(())
}

/// `daily resume`: the three questions for one named member, no readiness
/// check — used when someone missed the live round.
pub async fn resume(ctx: &DialogueContext, channel_id: &str, payload: &str) -> Result<()> {
    let ids = extract_mentions(payload);
    let Some(member_id) = ids.first() else {
        ctx.say(
            channel_id,
            "Tell me who to resume for, like `daily resume @username`.",
        )
        .await;
        return Ok(());
    };

    let members = match ctx.store.list_members(channel_id).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(channel = %channel_id, error = %e, "Failed to list members for resume");
            ctx.fail(channel_id).await;
            return Ok(());
        }
    };

    let Some(member) = members.iter().find(|m| m.id == *member_id) else {
        ctx.say(
            channel_id,
            &format!(
                "Member {} is not registered in this channel",
                mention(member_id)
            ),
        )
        .await;
        return Ok(());
    };

    let rules = match ctx.store.list_replies(channel_id).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(channel = %channel_id, error = %e, "Failed to list predefined replies");
            ctx.fail(channel_id).await;
            return Ok(());
        }
    };

    if let Flow::Cancelled = ask_questions(ctx, channel_id, member, &rules).await? {
        ctx.say(channel_id, "Ok, we can resume another time.").await;
    }
    Ok(())
}

enum Readiness {
    Ready,
    NotAvailable,
    Cancelled,
}

/// Bounded readiness wait. Replies that are neither yes nor no re-arm the
/// wait against the same deadline, so an undecided member cannot stall the
/// round past the timeout.
async fn readiness_check(
    ctx: &DialogueContext,
    channel_id: &str,
    member: &Member,
) -> Result<Readiness> {
    let participant = mention(&member.id);
    let deadline = Instant::now() + ctx.ready_timeout;
    let mut prompt = format!("Hi {}! Are you ready? Type `yes` or `no`", member.name);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(Readiness::NotAvailable);
        }
        match ctx
            .ask_timeout(channel_id, &participant, &prompt, remaining)
            .await?
        {
            Step::TimedOut => return Ok(Readiness::NotAvailable),
            Step::Cancelled => return Ok(Readiness::Cancelled),
            Step::Reply(text) => {
                if is_affirmative(&text) {
                    return Ok(Readiness::Ready);
                }
                if is_negative(&text) {
                    return Ok(Readiness::NotAvailable);
                }
                prompt = format!("{}, please answer `yes` or `no`", member.name);
            }
        }
    }
}

/// The three fixed questions, each with an unbounded wait and a predefined
/// reply lookup on the answer.
async fn ask_questions(
    ctx: &DialogueContext,
    channel_id: &str,
    member: &Member,
    rules: &[PredefinedReply],
) -> Result<Flow> {
    let participant = mention(&member.id);

    for (index, question) in QUESTIONS.iter().enumerate() {
        let prompt = format!("{}, {}", member.name, question);
        match ctx.ask(channel_id, &participant, &prompt).await? {
            Step::Cancelled => return Ok(Flow::Cancelled),
            Step::Reply(answer) => {
                if let Some(rule) = first_matching_rule(rules, index as u8, &answer) {
                    ctx.say(channel_id, &rule.reply).await;
                }
            }
            Step::TimedOut => unreachable!("question waits are unbounded"),
        }
    }

    ctx.say(channel_id, &format!("Thanks {}", member.name)).await;
    Ok(Flow::Continue)
}

/// First rule (in storage iteration order) whose pattern-match outcome
/// equals its polarity. There is no priority field; when several rules can
/// match the same question the storage order decides, as in the reference.
fn first_matching_rule<'a>(
    rules: &'a [PredefinedReply],
    question: u8,
    answer: &str,
) -> Option<&'a PredefinedReply> {
    rules
        .iter()
        .filter(|r| r.question == question)
        .find(|r| match Regex::new(&r.pattern) {
            Ok(re) => re.is_match(answer) == r.match_on_hit,
            Err(_) => false,
        })
}

/// Stamp the schedule's cooldown after a completed round, store first, then
/// the scheduler's cache. Channels without a schedule have nothing to stamp.
async fn mark_round_complete(ctx: &DialogueContext, channel_id: &str) {
    let Some(mut meeting) = ctx.schedule_cache.get(channel_id) else {
        return;
    };
    meeting.last_daily = Some(Utc::now());

    if let Err(e) = ctx.store.put_daily_meeting(&meeting).await {
        tracing::error!(channel = %channel_id, error = %e, "Failed to stamp completed round");
        ctx.fail(channel_id).await;
        return;
    }
    ctx.schedule_cache.upsert(meeting);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(question: u8, pattern: &str, match_on_hit: bool, reply: &str) -> PredefinedReply {
        PredefinedReply {
            channel_id: "C1".to_string(),
            question,
            reply: reply.to_string(),
            pattern: pattern.to_string(),
            match_on_hit,
        }
    }

    #[test]
    fn rule_fires_on_match_when_polarity_is_hit() {
        let rules = vec![rule(0, "done", true, "nice!")];
        assert!(first_matching_rule(&rules, 0, "I got it done").is_some());
        assert!(first_matching_rule(&rules, 0, "nothing").is_none());
    }

    #[test]
    fn rule_fires_on_miss_when_polarity_is_inverted() {
        let rules = vec![rule(2, "no impediments", false, "let's talk after")];
        assert!(first_matching_rule(&rules, 2, "blocked on reviews").is_some());
        assert!(first_matching_rule(&rules, 2, "no impediments").is_none());
    }

    #[test]
    fn rules_are_scoped_to_their_question() {
        let rules = vec![rule(0, "done", true, "nice!")];
        assert!(first_matching_rule(&rules, 1, "done").is_none());
    }

    #[test]
    fn first_satisfying_rule_wins_in_storage_order() {
        let rules = vec![
            rule(0, "done", true, "first wins"),
            rule(0, "done", true, "never reached"),
        ];
        let hit = first_matching_rule(&rules, 0, "done").unwrap();
        assert_eq!(hit.reply, "first wins");
    }

    #[test]
    fn broken_pattern_is_skipped() {
        let rules = vec![
            rule(0, "([unclosed", true, "broken"),
            rule(0, "done", true, "healthy"),
        ];
        let hit = first_matching_rule(&rules, 0, "done").unwrap();
        assert_eq!(hit.reply, "healthy");
    }
}
