// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One model call per turn, with a hard deadline and a guaranteed result.

use std::sync::Arc;
use std::time::Duration;

use bellhop_config::model::AgentConfig;
use bellhop_context::TurnContext;
use bellhop_core::{IntentResult, ModelProvider, ModelTurn};
use tracing::warn;

use crate::contract::parse_model_reply;
use crate::guidance::classify_guidance;
use crate::instruction::build_instruction;

/// Turns a customer message into a validated [`IntentResult`].
///
/// Fallback policy (contract, not detail): any provider error, timeout,
/// parse or schema failure yields [`IntentResult::fallback`] plus a `warn!`;
/// nothing is raised to the caller. The orchestrator always gets a result
/// it can act on.
pub struct PromptContract {
    provider: Arc<dyn ModelProvider>,
    agent: AgentConfig,
    request_timeout: Duration,
}

impl PromptContract {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        agent: AgentConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            agent,
            request_timeout,
        }
    }

    /// Run the contract for one turn.
    ///
    /// `order_active` steers the guidance toward order handling when the
    /// conversation already has an order in flight.
    pub async fn generate(
        &self,
        message: &str,
        channel: &str,
        context: &TurnContext,
        order_active: bool,
    ) -> IntentResult {
        let guidance = classify_guidance(message, order_active);
        let instruction =
            build_instruction(&self.agent, guidance, channel, &context.knowledge_block);

        let mut turns = context.history.clone();
        turns.push(ModelTurn::user(message));

        let raw = match tokio::time::timeout(
            self.request_timeout,
            self.provider.generate(&instruction, &turns),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                warn!(error = %err, "model call failed, using fallback reply");
                return IntentResult::fallback();
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.request_timeout.as_secs(),
                    "model call timed out, using fallback reply"
                );
                return IntentResult::fallback();
            }
        };

        match parse_model_reply(&raw) {
            Some(result) => result,
            None => {
                warn!("model reply failed contract validation, using fallback reply");
                IntentResult::fallback()
            }
        }
    }
}
