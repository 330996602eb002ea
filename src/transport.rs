// ABOUTME: Chat transport seam — trait for sending outbound text to a channel.
// ABOUTME: Includes MockTransport, which captures messages for dialogue tests.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for sending messages to chat channels.
/// Abstracts the platform connection so dialogues can run against a mock.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send plain text to a channel. Best-effort: callers log failures and
    /// carry on unless a step says otherwise.
    async fn send(&self, channel_id: &str, text: &str) -> Result<()>;
}

// =============================================================================
// Mock implementation for testing
// =============================================================================

use std::sync::{Arc, Mutex};

/// A message captured by `MockTransport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: String,
    pub text: String,
}

/// Mock transport for testing dialogues without a live connection.
#[derive(Default, Clone)]
pub struct MockTransport {
    messages: Arc<Mutex<Vec<SentMessage>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// The last message sent.
    pub fn last_message(&self) -> Option<SentMessage> {
        self.messages.lock().unwrap().last().cloned()
    }

    /// Whether any sent message contains the given text.
    pub fn has_message_containing(&self, text: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.text.contains(text))
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(SentMessage {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_captures_messages() {
        let transport = MockTransport::new();
        transport.send("C1", "hello team").await.unwrap();

        assert_eq!(transport.messages().len(), 1);
        assert!(transport.has_message_containing("hello"));
        assert_eq!(transport.last_message().unwrap().channel_id, "C1");
    }
}
