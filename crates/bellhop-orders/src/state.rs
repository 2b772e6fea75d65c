// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory order state and its storage mapping.

use bellhop_core::OrderPhase;
use bellhop_storage::models::OrderStateRecord;
use chrono::Utc;

/// The live order of one conversation.
///
/// Mirrors the single upserted `order_states` row; every transition writes
/// the whole record back, last writer wins.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderState {
    pub conversation_id: String,
    pub phase: OrderPhase,
    pub product: Option<String>,
    pub quantity: Option<u32>,
    pub confirmed: bool,
    pub ticket_id: Option<String>,
}

impl OrderState {
    /// A fresh order with nothing collected yet.
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            phase: OrderPhase::CollectingInfo,
            product: None,
            quantity: None,
            confirmed: false,
            ticket_id: None,
        }
    }

    pub fn from_record(record: &OrderStateRecord) -> Self {
        Self {
            conversation_id: record.conversation_id.clone(),
            phase: OrderPhase::from_str_value(&record.phase),
            product: record.product.clone(),
            quantity: record.quantity,
            confirmed: record.confirmed,
            ticket_id: record.ticket_id.clone(),
        }
    }

    pub fn to_record(&self) -> OrderStateRecord {
        OrderStateRecord {
            conversation_id: self.conversation_id.clone(),
            phase: self.phase.as_str().to_string(),
            product: self.product.clone(),
            quantity: self.quantity,
            confirmed: self.confirmed,
            ticket_id: self.ticket_id.clone(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    /// JSON snapshot attached to outbound messages and order tickets.
    pub fn snapshot_json(&self) -> String {
        serde_json::json!({
            "product": self.product,
            "quantity": self.quantity,
            "state": self.phase.as_str(),
            "confirmed": self.confirmed,
            "ticket_id": self.ticket_id,
        })
        .to_string()
    }
}
