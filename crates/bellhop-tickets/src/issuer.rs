// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single ticket-creation path.

use bellhop_core::{BellhopError, TicketKind, TicketPriority, TicketStatus};
use bellhop_storage::models::Ticket;
use bellhop_storage::queries::tickets;
use bellhop_storage::Database;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

/// Everything a caller decides about a new ticket.
///
/// Callers pick the priority: Low for unescalated support, High for orders
/// and escalations.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub title: String,
    pub customer_name: String,
    pub channel: String,
    pub kind: TicketKind,
    pub priority: TicketPriority,
    pub body: String,
    /// JSON order snapshot for order tickets.
    pub product_info: Option<String>,
    pub conversation_id: String,
}

/// Outcome of a create call.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub id: String,
    /// True when the originating message already had a ticket and no new
    /// one was created.
    pub deduplicated: bool,
}

/// Creates tickets idempotently and applies audited status updates.
#[derive(Clone)]
pub struct TicketIssuer {
    db: Database,
}

impl TicketIssuer {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a ticket for an originating message, or return the ticket that
    /// message already produced.
    ///
    /// New tickets start in status New with one "Ticket Created" history
    /// entry by actor "System". The link-table UNIQUE constraint backs the
    /// pre-check, so a redelivery racing this call still cannot produce a
    /// second ticket.
    pub async fn create(
        &self,
        draft: TicketDraft,
        originating_message_id: &str,
    ) -> Result<IssuedTicket, BellhopError> {
        if let Some(existing) = tickets::find_by_message(&self.db, originating_message_id).await? {
            debug!(
                ticket = existing.id.as_str(),
                message = originating_message_id,
                "message already has a ticket, returning it"
            );
            return Ok(IssuedTicket {
                id: existing.id,
                deduplicated: true,
            });
        }

        let now = Utc::now().to_rfc3339();
        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            customer_name: draft.customer_name,
            channel: draft.channel,
            kind: draft.kind.as_str().to_string(),
            status: TicketStatus::New.as_str().to_string(),
            priority: draft.priority.as_str().to_string(),
            body: draft.body,
            product_info: draft.product_info,
            conversation_id: draft.conversation_id,
            created_at: now.clone(),
            updated_at: now,
        };

        let inserted =
            tickets::insert_with_link(&self.db, &ticket, originating_message_id).await?;
        if !inserted {
            // Lost a race with another handler for the same message id.
            let existing = tickets::find_by_message(&self.db, originating_message_id)
                .await?
                .ok_or_else(|| {
                    BellhopError::Internal(format!(
                        "ticket link for message {originating_message_id} exists but no ticket found"
                    ))
                })?;
            return Ok(IssuedTicket {
                id: existing.id,
                deduplicated: true,
            });
        }

        info!(
            ticket = ticket.id.as_str(),
            kind = ticket.kind.as_str(),
            priority = ticket.priority.as_str(),
            "ticket created"
        );
        Ok(IssuedTicket {
            id: ticket.id,
            deduplicated: false,
        })
    }

    /// Move one ticket to a new status, writing one audit entry.
    pub async fn update_status(
        &self,
        ticket_id: &str,
        new_status: TicketStatus,
        actor: &str,
    ) -> Result<bool, BellhopError> {
        tickets::update_status(&self.db, ticket_id, new_status.as_str(), actor).await
    }

    /// Move several tickets to the same status in one operation.
    ///
    /// One audit entry per affected ticket, each recording that ticket's own
    /// previous status. Returns how many tickets were actually updated.
    pub async fn bulk_update_status(
        &self,
        ticket_ids: &[String],
        new_status: TicketStatus,
        actor: &str,
    ) -> Result<usize, BellhopError> {
        let updated =
            tickets::update_status_bulk(&self.db, ticket_ids, new_status.as_str(), actor).await?;
        info!(
            requested = ticket_ids.len(),
            updated,
            status = new_status.as_str(),
            "bulk status update applied"
        );
        Ok(updated)
    }
}
