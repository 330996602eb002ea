// ABOUTME: Inbound event dispatch — correlation delivery first, then classify-and-run.
// ABOUTME: One task per event; a slow dialogue never blocks the receive loop.

use std::sync::Arc;

use crate::dialogue::{self, members, replies, schedule, standup, DialogueContext};
use crate::event::{classify, CommandKind, EventKind, InboundEvent};

/// Route one inbound event. Called from its own spawned task.
///
/// Order matters: a message from a participant someone is waiting on is a
/// correlated reply, never a fresh command — the delivery check runs before
/// classification.
pub async fn dispatch(ctx: Arc<DialogueContext>, event: InboundEvent) {
    if event.kind == EventKind::Other {
        return;
    }

    let channel_id = event.channel_id();
    if channel_id.is_empty() {
        // Undeliverable: no routing key, drop silently.
        tracing::debug!("Dropping event with unresolvable channel");
        return;
    }

    if event.kind == EventKind::Message {
        let participant = event.participant_key();
        if ctx.registry.try_deliver(&channel_id, &participant, event.clone()) {
            tracing::debug!(
                channel = %channel_id,
                participant = %participant,
                "Delivered correlated reply"
            );
            return;
        }
    }

    let classified = classify(&event, &ctx.bot_id, &ctx.bot_name);
    let participant = event.participant_key();

    let outcome = match classified.kind {
        CommandKind::Hello => {
            dialogue::hello(&ctx, &channel_id).await;
            Ok(())
        }
        CommandKind::Help => {
            dialogue::help(&ctx, &channel_id).await;
            Ok(())
        }
        CommandKind::AddMember => {
            members::add_members(&ctx, &channel_id, &participant, &classified.text).await
        }
        CommandKind::DeleteMember => {
            members::delete_members(&ctx, &channel_id, &participant, &classified.text).await
        }
        CommandKind::ListMembers => members::list_members(&ctx, &channel_id).await,
        CommandKind::StartStandup => standup::run_round(&ctx, &channel_id).await,
        CommandKind::ResumeStandup => standup::resume(&ctx, &channel_id, &classified.text).await,
        CommandKind::Info => schedule::info(&ctx, &channel_id).await,
        CommandKind::Schedule => schedule::schedule(&ctx, &channel_id, &participant).await,
        CommandKind::AddReply => replies::add_reply(&ctx, &channel_id, &participant).await,
        CommandKind::DeleteReply => replies::delete_reply(&ctx, &channel_id, &participant).await,
        CommandKind::Command => {
            dialogue::not_understood(&ctx, &channel_id).await;
            Ok(())
        }
        // Uncorrelated text not addressed to the bot is none of our business.
        CommandKind::Reply => Ok(()),
    };

    if let Err(e) = outcome {
        tracing::error!(
            channel = %channel_id,
            kind = ?classified.kind,
            error = %e,
            "Dialogue run failed"
        );
    }
}
