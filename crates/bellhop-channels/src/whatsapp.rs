// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API sender.
//!
//! One instance serves every configured business phone number; the account
//! id on each send selects the credentials. Sends make a single attempt:
//! the pipeline treats a failed send as a handled turn, so retrying here
//! would duplicate messages on flaky networks.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bellhop_config::model::{WhatsAppAccount, WhatsAppConfig};
use bellhop_core::{BellhopError, ChannelSender};
use serde::Deserialize;
use tracing::debug;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Sends text messages through the WhatsApp Cloud API.
#[derive(Debug, Clone)]
pub struct WhatsAppSender {
    client: reqwest::Client,
    api_base: String,
    accounts: HashMap<String, WhatsAppAccount>,
}

impl WhatsAppSender {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, BellhopError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| BellhopError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let accounts = config
            .accounts
            .iter()
            .map(|a| (a.phone_number_id.clone(), a.clone()))
            .collect();
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            accounts,
        })
    }

    /// Point the sender at a different API base. Test hook for wiremock.
    pub fn with_api_base(mut self, url: String) -> Self {
        self.api_base = url.trim_end_matches('/').to_string();
        self
    }

    fn account(&self, account_id: &str) -> Result<&WhatsAppAccount, BellhopError> {
        self.accounts.get(account_id).ok_or_else(|| BellhopError::Channel {
            message: format!("no WhatsApp account configured for phone number id {account_id}"),
            source: None,
        })
    }
}

#[async_trait]
impl ChannelSender for WhatsAppSender {
    async fn send_text(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> Result<String, BellhopError> {
        let account = self.account(account_id)?;
        let url = format!("{}/{}/messages", self.api_base, account.phone_number_id);

        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": recipient,
            "type": "text",
            "text": { "body": text },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&account.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BellhopError::Channel {
                message: format!("WhatsApp send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BellhopError::Channel {
                message: format!("WhatsApp send returned {status}: {detail}"),
                source: None,
            });
        }

        let parsed: SendResponse = response.json().await.map_err(|e| BellhopError::Channel {
            message: format!("malformed WhatsApp send response: {e}"),
            source: Some(Box::new(e)),
        })?;

        let message_id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| BellhopError::Channel {
                message: "WhatsApp send response contained no message id".to_string(),
                source: None,
            })?;

        debug!(account = account_id, message_id = message_id.as_str(), "message sent");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: &str) -> WhatsAppConfig {
        WhatsAppConfig {
            api_base: api_base.to_string(),
            accounts: vec![WhatsAppAccount {
                phone_number_id: "1055".to_string(),
                access_token: "test-token".to_string(),
                verify_token: "verify-me".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn send_posts_text_and_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1055/messages"))
            .and(bearer_token("test-token"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "+9477001",
                "text": { "body": "hello there" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{ "id": "wamid.OUT1" }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sender = WhatsAppSender::new(&config(&server.uri())).unwrap();
        let id = sender.send_text("1055", "+9477001", "hello there").await.unwrap();
        assert_eq!(id, "wamid.OUT1");
    }

    #[tokio::test]
    async fn unknown_account_is_a_channel_error() {
        let sender = WhatsAppSender::new(&config("http://unused.invalid")).unwrap();
        let err = sender.send_text("9999", "+9477001", "hi").await.unwrap_err();
        assert!(err.to_string().contains("9999"));
    }

    #[tokio::test]
    async fn api_rejection_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1055/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let sender = WhatsAppSender::new(&config(&server.uri())).unwrap();
        let err = sender.send_text("1055", "+9477001", "hi").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"), "got: {msg}");
    }

    #[tokio::test]
    async fn missing_message_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1055/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [],
            })))
            .mount(&server)
            .await;

        let sender = WhatsAppSender::new(&config(&server.uri())).unwrap();
        let err = sender.send_text("1055", "+9477001", "hi").await.unwrap_err();
        assert!(err.to_string().contains("no message id"));
    }
}
