// ABOUTME: Inbound chat event model and the pure command classifier.
// ABOUTME: Resolves the dynamic channel payload once and tags events with a CommandKind.

use serde::Deserialize;

/// Raw event type from the RTM stream. Anything we don't handle collapses
/// into `Other` and is ignored by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    ChannelJoined,
    GroupJoined,
    #[serde(other)]
    #[default]
    Other,
}

/// The channel field of an RTM frame is a plain string on message events but
/// a structured payload on join events. Modeled as a tagged union and
/// resolved exactly once; nothing downstream inspects the raw payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    Id(String),
    Payload(serde_json::Value),
}

impl ChannelRef {
    /// Normalize to a plain channel id. Returns `None` when the payload
    /// carries no usable "id" key; such events are undeliverable.
    pub fn resolve(&self) -> Option<String> {
        match self {
            ChannelRef::Id(id) if !id.is_empty() => Some(id.clone()),
            ChannelRef::Id(_) => None,
            ChannelRef::Payload(value) => value
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }
}

/// One inbound chat event, ephemeral, one per transport receive.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    /// Author user id; empty for system-generated events.
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
}

impl InboundEvent {
    /// Resolved channel id, or empty string when unresolvable.
    pub fn channel_id(&self) -> String {
        self.channel
            .as_ref()
            .and_then(|c| c.resolve())
            .unwrap_or_default()
    }

    /// The mention-form key used for correlation, distinct from the plain
    /// user id used in storage records.
    pub fn participant_key(&self) -> String {
        mention(&self.user)
    }
}

/// Wrap a raw user id in Slack mention syntax.
pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

/// Classification of an inbound event against the command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Hello,
    Help,
    AddMember,
    DeleteMember,
    ListMembers,
    StartStandup,
    ResumeStandup,
    Info,
    Schedule,
    AddReply,
    DeleteReply,
    /// Addressed to the bot but matching no known command.
    Command,
    /// Not addressed to the bot at all.
    Reply,
}

/// A classified event: command kind, normalized channel id (empty when the
/// channel payload was unresolvable), and the argument payload after the
/// matched keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: CommandKind,
    pub channel_id: String,
    pub text: String,
}

/// Command keywords tried in priority order; the multi-word forms come
/// before their prefixes so "daily add reply" is never shadowed by a
/// shorter match, and the bare-command catch-all is tried last.
const COMMANDS: &[(&str, CommandKind)] = &[
    ("hello", CommandKind::Hello),
    ("help", CommandKind::Help),
    ("daily add member", CommandKind::AddMember),
    ("daily delete member", CommandKind::DeleteMember),
    ("daily list", CommandKind::ListMembers),
    ("daily add reply", CommandKind::AddReply),
    ("daily delete reply", CommandKind::DeleteReply),
    ("daily start", CommandKind::StartStandup),
    ("daily resume", CommandKind::ResumeStandup),
    ("daily info", CommandKind::Info),
    ("daily schedule", CommandKind::Schedule),
];

/// Classify an inbound event. Pure, total, deterministic: the same text and
/// bot identity always yield the same single classification.
pub fn classify(event: &InboundEvent, bot_id: &str, bot_name: &str) -> Classified {
    let channel_id = event.channel_id();

    let Some(rest) = strip_address(&event.text, bot_id, bot_name) else {
        return Classified {
            kind: CommandKind::Reply,
            channel_id,
            text: event.text.clone(),
        };
    };

    for (keyword, kind) in COMMANDS {
        if let Some(payload) = rest.strip_prefix(keyword) {
            return Classified {
                kind: *kind,
                channel_id,
                text: payload.trim().to_string(),
            };
        }
    }

    Classified {
        kind: CommandKind::Command,
        channel_id,
        text: rest.to_string(),
    }
}

/// The payload of a correlated reply: the text with any bot address prefix
/// removed. Participants habitually keep addressing the bot mid-dialogue
/// ("<@BOT>: yes"), so dialogue steps validate against this form.
pub fn reply_payload<'a>(text: &'a str, bot_id: &str, bot_name: &str) -> &'a str {
    strip_address(text, bot_id, bot_name).unwrap_or(text).trim()
}

/// Strip the bot address prefix — either an explicit `<@BOTID>` mention or
/// the bare bot name — returning the remaining command text. `None` means
/// the message is not addressed to the bot.
fn strip_address<'a>(text: &'a str, bot_id: &str, bot_name: &str) -> Option<&'a str> {
    let mention_prefix = format!("<@{}>", bot_id);
    let rest = if let Some(r) = text.strip_prefix(&mention_prefix) {
        r
    } else if !bot_name.is_empty() {
        text.strip_prefix(bot_name)?
    } else {
        return None;
    };
    Some(rest.trim_start_matches(':').trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> InboundEvent {
        InboundEvent {
            kind: EventKind::Message,
            channel: Some(ChannelRef::Id("C100".to_string())),
            user: "U42".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn classifies_mentioned_commands() {
        let cases = [
            ("<@B1>: hello", CommandKind::Hello),
            ("<@B1>: help", CommandKind::Help),
            ("<@B1>: daily add member <@U7>", CommandKind::AddMember),
            ("<@B1>: daily delete member <@U7>", CommandKind::DeleteMember),
            ("<@B1>: daily list", CommandKind::ListMembers),
            ("<@B1>: daily start", CommandKind::StartStandup),
            ("<@B1>: daily resume <@U7>", CommandKind::ResumeStandup),
            ("<@B1>: daily info", CommandKind::Info),
            ("<@B1>: daily schedule", CommandKind::Schedule),
            ("<@B1>: daily add reply", CommandKind::AddReply),
            ("<@B1>: daily delete reply", CommandKind::DeleteReply),
        ];
        for (text, expected) in cases {
            let c = classify(&message(text), "B1", "dailybot");
            assert_eq!(c.kind, expected, "text: {}", text);
            assert_eq!(c.channel_id, "C100");
        }
    }

    #[test]
    fn bare_name_prefix_works() {
        let c = classify(&message("dailybot: daily list"), "B1", "dailybot");
        assert_eq!(c.kind, CommandKind::ListMembers);
    }

    #[test]
    fn payload_follows_keyword() {
        let c = classify(&message("<@B1>: daily add member <@U7> <@U8>"), "B1", "dailybot");
        assert_eq!(c.text, "<@U7> <@U8>");
    }

    #[test]
    fn add_reply_not_shadowed_by_generic_command() {
        // "daily add reply" shares a prefix with nothing shorter in the
        // table, but the catch-all must never win over it.
        let c = classify(&message("<@B1>: daily add reply"), "B1", "dailybot");
        assert_eq!(c.kind, CommandKind::AddReply);
    }

    #[test]
    fn unknown_addressed_text_is_generic_command() {
        let c = classify(&message("<@B1>: make me a sandwich"), "B1", "dailybot");
        assert_eq!(c.kind, CommandKind::Command);
    }

    #[test]
    fn unaddressed_text_is_plain_reply() {
        let c = classify(&message("just chatting"), "B1", "dailybot");
        assert_eq!(c.kind, CommandKind::Reply);
        assert_eq!(c.text, "just chatting");
    }

    #[test]
    fn join_payload_channel_resolves_by_id_key() {
        let event = InboundEvent {
            kind: EventKind::ChannelJoined,
            channel: Some(ChannelRef::Payload(serde_json::json!({
                "id": "G55", "name": "standup", "is_channel": false
            }))),
            user: String::new(),
            text: "<@B1>: hello".to_string(),
        };
        let c = classify(&event, "B1", "dailybot");
        assert_eq!(c.kind, CommandKind::Hello);
        assert_eq!(c.channel_id, "G55");
    }

    #[test]
    fn unresolvable_channel_yields_empty_id() {
        let event = InboundEvent {
            kind: EventKind::GroupJoined,
            channel: Some(ChannelRef::Payload(serde_json::json!({ "name": "x" }))),
            user: String::new(),
            text: "<@B1>: hello".to_string(),
        };
        assert_eq!(classify(&event, "B1", "dailybot").channel_id, "");
    }

    #[test]
    fn classification_is_deterministic() {
        let event = message("<@B1>: daily start");
        let first = classify(&event, "B1", "dailybot");
        for _ in 0..10 {
            assert_eq!(classify(&event, "B1", "dailybot"), first);
        }
    }

    #[test]
    fn rtm_frame_deserializes() {
        let raw = r#"{"type":"message","channel":"C1","user":"U9","text":"hi","ts":"123.45"}"#;
        let event: InboundEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.channel_id(), "C1");
        assert_eq!(event.participant_key(), "<@U9>");
    }

    #[test]
    fn unknown_event_type_collapses_to_other() {
        let raw = r#"{"type":"presence_change","user":"U9"}"#;
        let event: InboundEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind, EventKind::Other);
    }
}
