// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::BellhopError;

/// Outbound messaging channel.
///
/// One implementation per messaging platform. The pipeline treats send
/// failures as non-fatal: the turn's state changes have already been
/// persisted by the time a send is attempted.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Deliver `text` to `recipient` through the business account identified
    /// by `account_id`, returning the provider's message id.
    ///
    /// `account_id` selects the credentials; for WhatsApp it is the phone
    /// number id the inbound webhook arrived on.
    async fn send_text(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> Result<String, BellhopError>;
}
