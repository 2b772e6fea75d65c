// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock outbound channel that captures what would have been sent.

use async_trait::async_trait;
use bellhop_core::{BellhopError, ChannelSender};
use tokio::sync::Mutex;

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub account_id: String,
    pub recipient: String,
    pub text: String,
}

/// Captures outbound sends; optionally fails every send to exercise the
/// degraded channel path.
pub struct MockSender {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: bool,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: false,
        }
    }

    /// A sender whose every send returns a channel error.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// The last captured message text, if any.
    pub async fn last_text(&self) -> Option<String> {
        self.sent.lock().await.last().map(|m| m.text.clone())
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for MockSender {
    async fn send_text(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> Result<String, BellhopError> {
        if self.fail_sends {
            return Err(BellhopError::Channel {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        let mut sent = self.sent.lock().await;
        sent.push(SentMessage {
            account_id: account_id.to_string(),
            recipient: recipient.to_string(),
            text: text.to_string(),
        });
        Ok(format!("mock-wamid-{}", sent.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_sends_in_order() {
        let sender = MockSender::new();
        sender.send_text("1055", "+9477001", "one").await.unwrap();
        sender.send_text("1055", "+9477001", "two").await.unwrap();
        let sent = sender.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text, "one");
        assert_eq!(sender.last_text().await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn failing_sender_errors_without_capturing() {
        let sender = MockSender::failing();
        assert!(sender.send_text("1055", "+9477001", "x").await.is_err());
        assert!(sender.sent().await.is_empty());
    }
}
