// ABOUTME: Member management dialogues — add, delete, and list standup participants.
// ABOUTME: Mentions given with the command are used directly; otherwise the bot prompts.

use anyhow::Result;

use super::{DialogueContext, Step, NONE_REGISTERED};
use crate::event::mention;
use crate::parse::extract_mentions;
use crate::store::StoreError;
use crate::types::Member;

const PROMPT_ADD: &str =
    "Who should join the daily meeting? Mention them like `@username`, or type `cancel`.";
const PROMPT_DELETE: &str =
    "Who should leave the daily meeting? Mention them like `@username`, or type `cancel`.";

/// `daily add member`: register one or more mentioned users in the channel.
pub async fn add_members(
    ctx: &DialogueContext,
    channel_id: &str,
    participant: &str,
    payload: &str,
) -> Result<()> {
    let Some(ids) = collect_mentions(ctx, channel_id, participant, payload, PROMPT_ADD).await?
    else {
        return Ok(());
    };

    for id in ids {
        let member = Member {
            id: id.clone(),
            name: mention(&id),
            channel_id: channel_id.to_string(),
            team_id: ctx.team_id.clone(),
        };
        match ctx.store.add_member(&member).await {
            Ok(()) => {
                ctx.say(
                    channel_id,
                    &format!("Team member {} registered", member.name),
                )
                .await;
            }
            Err(e) => {
                tracing::error!(channel = %channel_id, member = %id, error = %e, "Failed to store member");
                ctx.fail(channel_id).await;
                return Ok(());
            }
        }
    }
    Ok(())
}

/// `daily delete member`: remove mentioned users. Deleting someone who was
/// never registered gets the specific not-found message, not the generic
/// failure.
pub async fn delete_members(
    ctx: &DialogueContext,
    channel_id: &str,
    participant: &str,
    payload: &str,
) -> Result<()> {
    let Some(ids) = collect_mentions(ctx, channel_id, participant, payload, PROMPT_DELETE).await?
    else {
        return Ok(());
    };

    for id in ids {
        match ctx.store.delete_member(channel_id, &id).await {
            Ok(()) => {
                ctx.say(channel_id, &format!("Team member {} deleted", mention(&id)))
                    .await;
            }
            Err(StoreError::NotFound) => {
                ctx.say(
                    channel_id,
                    &format!(
                        "Member {} is not registered in this channel",
                        mention(&id)
                    ),
                )
                .await;
            }
            Err(e) => {
                tracing::error!(channel = %channel_id, member = %id, error = %e, "Failed to delete member");
                ctx.fail(channel_id).await;
                return Ok(());
            }
        }
    }
    Ok(())
}

/// `daily list`: stateless read-and-format.
pub async fn list_members(ctx: &DialogueContext, channel_id: &str) -> Result<()> {
    let members = match ctx.store.list_members(channel_id).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(channel = %channel_id, error = %e, "Failed to list members");
            ctx.fail(channel_id).await;
            return Ok(());
        }
    };

    if members.is_empty() {
        ctx.say(channel_id, NONE_REGISTERED).await;
        return Ok(());
    }

    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    ctx.say(
        channel_id,
        &format!(
            "Members registered for the next Daily Sprint: {}",
            names.join(", ")
        ),
    )
    .await;
    Ok(())
}

/// Mentions from the command payload, or from a prompt/reprompt loop when
/// the payload has none. `None` means the dialogue was cancelled.
async fn collect_mentions(
    ctx: &DialogueContext,
    channel_id: &str,
    participant: &str,
    payload: &str,
    prompt: &str,
) -> Result<Option<Vec<String>>> {
    let ids = extract_mentions(payload);
    if !ids.is_empty() {
        return Ok(Some(ids));
    }

    let mut prompt = prompt.to_string();
    loop {
        match ctx.ask(channel_id, participant, &prompt).await? {
            Step::Cancelled => {
                ctx.say(channel_id, "Ok, nothing changed.").await;
                return Ok(None);
            }
            Step::Reply(text) => {
                let ids = extract_mentions(&text);
                if !ids.is_empty() {
                    return Ok(Some(ids));
                }
                prompt = "I didn't spot any `@username` mention there. Try again or type `cancel`."
                    .to_string();
            }
            Step::TimedOut => unreachable!("member dialogue waits are unbounded"),
        }
    }
}
