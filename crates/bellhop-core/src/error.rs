// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Bellhop support agent.

use thiserror::Error;

/// The primary error type used across all Bellhop crates.
///
/// Two failure classes never appear here: a model reply that fails schema
/// validation is replaced by the prompt contract's default result, and a
/// replayed provider message id is short-circuited to a successful no-op.
/// Neither is an error to callers.
#[derive(Debug, Error)]
pub enum BellhopError {
    /// Malformed inbound payload. Rejected before any state is mutated.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors (invalid TOML, missing required fields, bad ranges).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel delivery errors (send failure, bad recipient, missing credentials).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model or embedding provider errors (API failure, malformed response body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An awaited round-trip exceeded its bounded timeout.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
