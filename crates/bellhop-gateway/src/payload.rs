// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API delivery payload.
//!
//! The platform nests messages three levels deep and mixes status receipts
//! into the same shape. Everything here is `#[serde(default)]` tolerant;
//! only a body that is not valid JSON for the outer shape rejects.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<WaMessage>,
    /// Delivery/read receipts. Parsed so they don't reject, then ignored.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

/// One inbound text message flattened out of the payload nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundText {
    /// Receiving business phone number id.
    pub account_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub provider_message_id: String,
    pub text: String,
}

/// Flatten a delivery payload into its text messages.
///
/// Non-text messages and status-only changes contribute nothing. Sender
/// names come from the change's contacts block, matched by wa_id.
pub fn extract_text_messages(payload: &WebhookPayload) -> Vec<InboundText> {
    let mut out = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            let value = &change.value;
            let account_id = value
                .metadata
                .as_ref()
                .map(|m| m.phone_number_id.clone())
                .unwrap_or_default();
            for message in &value.messages {
                if message.kind != "text" {
                    continue;
                }
                let Some(text) = message.text.as_ref().filter(|t| !t.body.is_empty()) else {
                    continue;
                };
                let sender_name = value
                    .contacts
                    .iter()
                    .find(|c| c.wa_id == message.from)
                    .and_then(|c| c.profile.as_ref())
                    .and_then(|p| p.name.clone());
                out.push(InboundText {
                    account_id: account_id.clone(),
                    sender_id: message.from.clone(),
                    sender_name,
                    provider_message_id: message.id.clone(),
                    text: text.body.clone(),
                });
            }
        }
    }
    out
}
