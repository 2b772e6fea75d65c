// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order placement state machine for the Bellhop support agent.
//!
//! An order walks CollectingInfo -> Confirming -> Processing -> Completed,
//! never skipping a phase. Confirming additionally exits to Cancelled on an
//! exact negative token. [`OrderTracker`] owns the transitions and their
//! persistence; confirmation token matching lives in [`tokens`] because the
//! agent checks it before any model call.

pub mod state;
pub mod tokens;
pub mod tracker;

pub use state::OrderState;
pub use tokens::{read_confirmation, Confirmation};
pub use tracker::{OrderAdvance, OrderTracker};
