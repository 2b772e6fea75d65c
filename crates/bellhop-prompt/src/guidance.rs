// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword heuristics picking which guidance block the instruction gets.
//!
//! This is a cheap pre-classification that shapes the prompt; the real
//! intent verdict comes from the model. Misclassification here costs a
//! slightly less focused instruction, nothing more.

/// Which guidance block to include in the system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceKind {
    Order,
    Support,
    General,
}

const ORDER_KEYWORDS: &[&str] = &[
    "buy", "order", "purchase", "price", "cost", "how much", "deliver",
];

const SUPPORT_KEYWORDS: &[&str] = &[
    "help", "problem", "issue", "broken", "not working", "complaint", "refund", "wrong",
];

/// Classify a message for guidance purposes.
///
/// An in-flight order keeps the conversation in order guidance no matter
/// what the message says; otherwise order keywords beat support keywords.
pub fn classify_guidance(message: &str, order_active: bool) -> GuidanceKind {
    if order_active {
        return GuidanceKind::Order;
    }
    let lowered = message.to_lowercase();
    if ORDER_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return GuidanceKind::Order;
    }
    if SUPPORT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return GuidanceKind::Support;
    }
    GuidanceKind::General
}
