// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types, errors, and trait seams for the Bellhop support agent.
//!
//! The heavier crates (storage, model client, channels) all depend on
//! this one and compose through the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::BellhopError;
pub use traits::{ChannelSender, EmbeddingProvider, ModelProvider};
pub use types::{
    clamp_unit, DetectedEntities, Intent, IntentResult, KnowledgeMatch, MatchMetadata,
    MatchSource, ModelTurn, OrderInfo, OrderPhase, TicketKind, TicketPriority, TicketStatus,
    TurnRole, UrgencyLevel, FALLBACK_RESPONSE,
};
