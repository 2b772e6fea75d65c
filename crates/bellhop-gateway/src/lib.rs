// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API webhook gateway.
//!
//! Two endpoints do the real work: `GET /webhook` answers the platform's
//! verification handshake and `POST /webhook` accepts delivery payloads,
//! deduplicates them by provider message id, and feeds text messages into
//! the batcher. Signature verification is expected to happen in front of
//! this service.

pub mod handlers;
pub mod payload;
pub mod server;

pub use server::{start_server, GatewayState};
