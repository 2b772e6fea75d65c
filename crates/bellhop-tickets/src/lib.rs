// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket issuance for the Bellhop support agent.
//!
//! Every path that creates a ticket (escalation, support logging, order
//! completion) goes through [`TicketIssuer`] so the idempotency rule holds
//! everywhere: one originating message id yields at most one ticket, ever.

pub mod issuer;

pub use issuer::{IssuedTicket, TicketDraft, TicketIssuer};
