// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt construction and the model reply contract.
//!
//! Three pieces, used in order on every turn: [`classify_guidance`] picks a
//! guidance block from keyword heuristics, [`build_instruction`] composes the
//! full system instruction around it, and [`parse_model_reply`] validates the
//! raw completion into an [`IntentResult`](bellhop_core::IntentResult).
//! [`PromptContract`] drives all three around a single bounded model call.

pub mod contract;
pub mod generator;
pub mod guidance;
pub mod instruction;

pub use contract::parse_model_reply;
pub use generator::PromptContract;
pub use guidance::{classify_guidance, GuidanceKind};
pub use instruction::build_instruction;
