// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::BellhopError;
use crate::types::ModelTurn;

/// A conversational model backend.
///
/// Implementations make exactly one attempt per call. Retry and fallback
/// policy belongs to the caller, which substitutes a safe default result
/// rather than retrying a slow or failing model inside the turn.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate a raw completion for the given system instruction and turns.
    ///
    /// Returns the model's text verbatim, including any code fences or
    /// reasoning markup. Parsing is the caller's concern.
    async fn generate(
        &self,
        system_instruction: &str,
        turns: &[ModelTurn],
    ) -> Result<String, BellhopError>;
}
