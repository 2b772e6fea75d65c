// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract types shared across the Bellhop pipeline.
//!
//! The model-reply contract ([`IntentResult`] and friends) is deliberately
//! strict: enumerated intents, enumerated urgency, bounded confidence. The
//! prompt contract validates raw model output into these types and falls
//! back to [`IntentResult::fallback`] when validation fails, which keeps the
//! orchestrator deterministic under a non-deterministic collaborator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Reply text used whenever the pipeline degrades to its safe default.
pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, I'm having trouble processing your message right now. \
     Could you please try again in a moment?";

/// Classified intent of one inbound turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// The customer explicitly asked for a human agent.
    HumanAgentRequest,
    /// A support problem that may become a ticket.
    SupportRequest,
    /// The customer wants to buy something.
    OrderPlacement,
    /// Anything else.
    GeneralQuery,
}

/// Urgency assessed by the model for one turn.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UrgencyLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Order fields the model extracted from the customer's message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Entities the model detected in one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedEntities {
    #[serde(default)]
    pub product_mentions: Vec<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub urgency_level: UrgencyLevel,
    #[serde(default)]
    pub order_info: Option<OrderInfo>,
}

/// Validated result of one model call. Produced once per turn, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Classification confidence, clamped to [0, 1].
    pub confidence: f64,
    /// User-facing reply text.
    pub response: String,
    pub requires_escalation: bool,
    pub escalation_reason: Option<String>,
    pub detected_entities: DetectedEntities,
}

impl IntentResult {
    /// The safe default substituted on any provider, parse, or schema failure.
    ///
    /// This is a contract, not a convenience: callers never see a raw model
    /// failure, they see a general-query result with an apologetic reply.
    pub fn fallback() -> Self {
        Self {
            intent: Intent::GeneralQuery,
            confidence: 0.5,
            response: FALLBACK_RESPONSE.to_string(),
            requires_escalation: false,
            escalation_reason: None,
            detected_entities: DetectedEntities::default(),
        }
    }
}

/// Which corpus a knowledge match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Knowledge,
    Product,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Knowledge => "knowledge",
            MatchSource::Product => "product",
        }
    }
}

/// Metadata carried by a knowledge match (populated for product matches).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Discount percentage in [0, 100].
    #[serde(default)]
    pub discount: Option<f64>,
}

/// One ranked result from hybrid knowledge retrieval. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeMatch {
    pub id: String,
    pub content: String,
    /// Vector-channel similarity in [0, 1]; 0.0 for text-only matches.
    pub similarity: f64,
    pub source: MatchSource,
    pub metadata: MatchMetadata,
}

/// Lifecycle phase of a per-conversation order.
///
/// Phases advance only along CollectingInfo -> Confirming -> Processing ->
/// Completed. Cancelled is terminal and reachable only from Confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderPhase {
    CollectingInfo,
    Confirming,
    Processing,
    Completed,
    Cancelled,
}

impl OrderPhase {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPhase::CollectingInfo => "COLLECTING_INFO",
            OrderPhase::Confirming => "CONFIRMING",
            OrderPhase::Processing => "PROCESSING",
            OrderPhase::Completed => "COMPLETED",
            OrderPhase::Cancelled => "CANCELLED",
        }
    }

    /// Parse from the storage string, defaulting to the initial phase.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "CONFIRMING" => OrderPhase::Confirming,
            "PROCESSING" => OrderPhase::Processing,
            "COMPLETED" => OrderPhase::Completed,
            "CANCELLED" => OrderPhase::Cancelled,
            _ => OrderPhase::CollectingInfo,
        }
    }

    /// Completed and Cancelled never transition again; a new order placement
    /// starts a fresh record instead.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderPhase::Completed | OrderPhase::Cancelled)
    }
}

/// Dashboard-visible ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    New,
    InProgress,
    Escalated,
    Completed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "New",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Escalated => "Escalated",
            TicketStatus::Completed => "Completed",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "In Progress" => TicketStatus::InProgress,
            "Escalated" => TicketStatus::Escalated,
            "Completed" => TicketStatus::Completed,
            _ => TicketStatus::New,
        }
    }
}

/// Ticket priority. Callers default Low for unescalated support and High for
/// orders and escalations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketPriority {
    #[default]
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Medium => "MEDIUM",
            TicketPriority::High => "HIGH",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "MEDIUM" => TicketPriority::Medium,
            "HIGH" => TicketPriority::High,
            _ => TicketPriority::Low,
        }
    }
}

/// What kind of work a ticket represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketKind {
    Support,
    Order,
    Escalation,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Support => "SUPPORT",
            TicketKind::Order => "ORDER",
            TicketKind::Escalation => "ESCALATION",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "ORDER" => TicketKind::Order,
            "ESCALATION" => TicketKind::Escalation,
            _ => TicketKind::Support,
        }
    }
}

/// Role of one turn handed to the model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One conversation turn in a model request.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ModelTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Clamp a score to the unit interval. NaN collapses to 0.0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
