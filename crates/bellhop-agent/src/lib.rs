// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration: the pipeline that takes one batched customer turn
//! from conversation lookup through model call, order state machine,
//! escalation policy, ticketing, and the outbound reply.

pub mod engine;
pub mod escalation;

pub use engine::TurnEngine;
pub use escalation::{decide, EscalationDecision};
