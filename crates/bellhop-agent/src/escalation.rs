// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-handoff policy.
//!
//! A pure, ordered rule list over the turn's classified result. The model's
//! own `requires_escalation` flag is advisory only; the decision here is
//! what actually creates an escalation ticket, so the rules are fixed in
//! code rather than delegated to the model.

use bellhop_core::{Intent, IntentResult, UrgencyLevel};

pub const REASON_HUMAN_AGENT_REQUEST: &str = "explicit human agent request";
pub const REASON_HIGH_URGENCY: &str = "high urgency request requires immediate attention";
pub const REASON_LOW_CONFIDENCE: &str = "multiple messages with low confidence responses";

/// How many messages a conversation must exceed before the low-confidence
/// rule can fire.
const LOW_CONFIDENCE_MESSAGE_FLOOR: u64 = 5;
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationDecision {
    pub requires_escalation: bool,
    pub reason: Option<&'static str>,
}

impl EscalationDecision {
    fn escalate(reason: &'static str) -> Self {
        Self {
            requires_escalation: true,
            reason: Some(reason),
        }
    }

    fn none() -> Self {
        Self {
            requires_escalation: false,
            reason: None,
        }
    }
}

/// Decide whether this turn hands off to a human. First matching rule wins.
pub fn decide(
    result: &IntentResult,
    urgency: UrgencyLevel,
    message_count: u64,
) -> EscalationDecision {
    if result.intent == Intent::HumanAgentRequest {
        return EscalationDecision::escalate(REASON_HUMAN_AGENT_REQUEST);
    }
    if urgency == UrgencyLevel::High {
        return EscalationDecision::escalate(REASON_HIGH_URGENCY);
    }
    if message_count > LOW_CONFIDENCE_MESSAGE_FLOOR && result.confidence < LOW_CONFIDENCE_THRESHOLD
    {
        return EscalationDecision::escalate(REASON_LOW_CONFIDENCE);
    }
    EscalationDecision::none()
}
