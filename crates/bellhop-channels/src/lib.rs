// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging for the Bellhop support agent.
//!
//! [`WhatsAppSender`] implements the core `ChannelSender` seam against the
//! WhatsApp Cloud API; [`ResponseFormatter`] applies the administrator's
//! per-channel templates to reply text before it is sent.

pub mod formatter;
pub mod whatsapp;

pub use formatter::ResponseFormatter;
pub use whatsapp::WhatsAppSender;
