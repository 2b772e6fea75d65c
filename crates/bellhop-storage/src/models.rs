// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row models for storage entities.
//!
//! Timestamps are RFC 3339 strings produced by `chrono`; queries order by
//! them lexicographically. Enumerated columns (direction, phase, status)
//! are stored as their wire strings and parsed back through the `_value`
//! helpers in `bellhop-core`.

use serde::{Deserialize, Serialize};

/// One conversation: a (channel, contact) pair with its context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub channel: String,
    pub contact_id: String,
    pub contact_name: Option<String>,
    /// When false the agent stores inbound messages but never replies.
    pub ai_enabled: bool,
    /// Memory length in exchange pairs; the history window is twice this.
    pub memory_length: u32,
    /// Inactivity timeout in hours before context resets.
    pub memory_timeout_hours: u32,
    /// Bumped by the agent after each successfully handled turn.
    pub last_context_update: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Direction of a stored message.
pub const DIRECTION_RECEIVED: &str = "received";
pub const DIRECTION_SENT: &str = "sent";

/// One message in the conversation log. Sent rows carry an order-state
/// snapshot as JSON when an order was in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub direction: String,
    pub body: String,
    pub order_info: Option<String>,
    pub created_at: String,
}

/// The single per-conversation order record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStateRecord {
    pub conversation_id: String,
    /// Phase wire string, parsed via `OrderPhase::from_str_value`.
    pub phase: String,
    pub product: Option<String>,
    pub quantity: Option<u32>,
    pub confirmed: bool,
    /// Set once the completed order has spawned its ticket.
    pub ticket_id: Option<String>,
    pub updated_at: String,
}

/// One support/order/escalation ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub customer_name: String,
    pub channel: String,
    /// Kind wire string ("SUPPORT", "ORDER", "ESCALATION").
    pub kind: String,
    /// Status wire string ("New", "In Progress", "Escalated", "Completed").
    pub status: String,
    /// Priority wire string ("LOW", "MEDIUM", "HIGH").
    pub priority: String,
    pub body: String,
    /// JSON order snapshot for order tickets.
    pub product_info: Option<String>,
    pub conversation_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry in a ticket's append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEvent {
    pub id: i64,
    pub ticket_id: String,
    pub action: String,
    pub previous_status: Option<String>,
    pub new_status: Option<String>,
    pub previous_assignee: Option<String>,
    pub new_assignee: Option<String>,
    pub actor: String,
    pub created_at: String,
}

/// One row from the operational error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub id: i64,
    pub component: String,
    pub severity: String,
    pub message: String,
    pub metadata: Option<String>,
    pub created_at: String,
}
