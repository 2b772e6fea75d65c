// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Bellhop integration tests.
//!
//! Mock model, embedder, and channel sender plus a [`TestHarness`] that
//! assembles the full turn pipeline over a temp SQLite database, so tests
//! run fast, deterministic, and without external services.

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_channel::MockSender;
pub use mock_provider::{MockModel, StubEmbedder};
