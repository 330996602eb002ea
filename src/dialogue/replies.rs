// ABOUTME: Predefined-reply dialogues — configure and remove automated standup replies.
// ABOUTME: Question ordinal → /pattern/ → match polarity → verbatim reply text.

use anyhow::Result;

use super::{DialogueContext, Step};
use crate::parse::{extract_ordinal, extract_pattern, is_affirmative, is_negative};
use crate::types::PredefinedReply;

const QUESTION_NAMES: [&str; 3] = ["first", "second", "last"];

/// `daily add reply`: collect a reply rule step by step and persist it.
pub async fn add_reply(ctx: &DialogueContext, channel_id: &str, participant: &str) -> Result<()> {
    let Some(question) = ask_question_index(ctx, channel_id, participant).await? else {
        return Ok(());
    };

    // Pattern
    let mut prompt = "Which pattern should I look for in the answer? \
        Wrap it in slashes, like `/done/`."
        .to_string();
    let pattern = loop {
        match ctx.ask(channel_id, participant, &prompt).await? {
            Step::Cancelled => return cancelled(ctx, channel_id).await,
            Step::Reply(text) => {
                if let Some(pattern) = extract_pattern(&text) {
                    break pattern;
                }
                prompt = "I need a valid expression between `/` delimiters, like `/nothing|nope/`."
                    .to_string();
            }
            Step::TimedOut => unreachable!("reply dialogue waits are unbounded"),
        }
    };

    // Polarity
    let mut prompt = "Should I reply when the pattern matches? \
        `yes` replies on a match, `no` replies when it does not match."
        .to_string();
    let match_on_hit = loop {
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
            Step::TimedOut => unreachable!("reply dialogue waits are unbounded"),
        }
    };

    // Reply text: any text is accepted verbatim, including a literal
    // "cancel" — this is the one step where the keyword is not a command.
    let handle = ctx.registry.await_reply(channel_id, participant)?;
    ctx.say(channel_id, "And what should I reply?").await;
    let event = handle.recv().await?;
    let reply_text =
        crate::event::reply_payload(&event.text, &ctx.bot_id, &ctx.bot_name).to_string();

    let rule = PredefinedReply {
        channel_id: channel_id.to_string(),
        question,
        reply: reply_text,
        pattern,
        match_on_hit,
    };

    if let Err(e) = ctx.store.add_reply(&rule).await {
        tracing::error!(channel = %channel_id, error = %e, "Failed to store predefined reply");
        ctx.fail(channel_id).await;
        return Ok(());
    }

    ctx.say(
        channel_id,
        &format!(
            "Done — I'll watch the {} question for `/{}/`.",
            QUESTION_NAMES[question as usize], rule.pattern
        ),
    )
    .await;
    Ok(())
}

/// `daily delete reply`: drop all rules for one question of the channel.
/// Rules carry no id, so deletion is scoped to the (channel, question) pair.
pub async fn delete_reply(ctx: &DialogueContext, channel_id: &str, participant: &str) -> Result<()> {
    let Some(question) = ask_question_index(ctx, channel_id, participant).await? else {
        return Ok(());
    };

    match ctx.store.delete_replies(channel_id, question).await {
        Ok(0) => {
            ctx.say(
                channel_id,
                &format!(
                    "There were no replies configured for the {} question.",
                    QUESTION_NAMES[question as usize]
                ),
            )
            .await;
        }
        Ok(count) => {
            ctx.say(
                channel_id,
                &format!(
                    "Removed {} configured {} for the {} question.",
                    count,
                    if count == 1 { "reply" } else { "replies" },
                    QUESTION_NAMES[question as usize]
                ),
            )
            .await;
        }
        Err(e) => {
            tracing::error!(channel = %channel_id, error = %e, "Failed to delete predefined replies");
            ctx.fail(channel_id).await;
        }
    }
    Ok(())
}

/// Shared first step: which of the three questions the rule applies to.
/// `None` means cancelled.
async fn ask_question_index(
    ctx: &DialogueContext,
    channel_id: &str,
    participant: &str,
) -> Result<Option<u8>> {
    let mut prompt = "Which question is this about? `first` (yesterday), \
        `second` (today) or `last` (impediments)."
        .to_string();
    loop {
        match ctx.ask(channel_id, participant, &prompt).await? {
            Step::Cancelled => {
                cancelled(ctx, channel_id).await?;
                return Ok(None);
            }
            Step::Reply(text) => {
                if let Some(index) = extract_ordinal(&text) {
                    return Ok(Some(index));
                }
                prompt = "Please pick `first`, `second` or `last`.".to_string();
            }
            Step::TimedOut => unreachable!("reply dialogue waits are unbounded"),
        }
    }
}

async fn cancelled(ctx: &DialogueContext, channel_id: &str) -> Result<()> {
    ctx.say(channel_id, "Ok, replies unchanged.").await;
    Ok(())
}
