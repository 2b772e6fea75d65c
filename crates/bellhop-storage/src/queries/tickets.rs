// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket persistence: creation with message links, status updates with
//! audit history, and lookups.

use bellhop_core::BellhopError;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::models::{Ticket, TicketEvent};

/// History action written when a ticket is created.
pub const ACTION_CREATED: &str = "Ticket Created";
/// History action written on a status change.
pub const ACTION_STATUS_UPDATED: &str = "Status Updated";

const TICKET_COLUMNS: &str = "id, title, customer_name, channel, kind, status, priority, \
     body, product_info, conversation_id, created_at, updated_at";

fn row_to_ticket(row: &rusqlite::Row<'_>) -> Result<Ticket, rusqlite::Error> {
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        customer_name: row.get(2)?,
        channel: row.get(3)?,
        kind: row.get(4)?,
        status: row.get(5)?,
        priority: row.get(6)?,
        body: row.get(7)?,
        product_info: row.get(8)?,
        conversation_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Find the ticket already linked to a message, if any.
pub async fn find_by_message(
    db: &Database,
    message_id: &str,
) -> Result<Option<Ticket>, BellhopError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let columns = TICKET_COLUMNS
                .split(',')
                .map(|c| format!("t.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            let select = format!(
                "SELECT {columns} FROM tickets t \
                 JOIN ticket_links l ON l.ticket_id = t.id \
                 WHERE l.message_id = ?1"
            );
            let ticket = conn
                .query_row(&select, params![message_id], row_to_ticket)
                .optional()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a ticket linked to the message that caused it, plus the initial
/// history entry, in one transaction.
///
/// Returns `false` without writing anything when the message already has a
/// ticket. This is the idempotency guarantee for redelivered messages.
pub async fn insert_with_link(
    db: &Database,
    ticket: &Ticket,
    message_id: &str,
) -> Result<bool, BellhopError> {
    let ticket = ticket.clone();
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT ticket_id FROM ticket_links WHERE message_id = ?1",
                    params![message_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO tickets \
                 (id, title, customer_name, channel, kind, status, priority, body, \
                  product_info, conversation_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    ticket.id,
                    ticket.title,
                    ticket.customer_name,
                    ticket.channel,
                    ticket.kind,
                    ticket.status,
                    ticket.priority,
                    ticket.body,
                    ticket.product_info,
                    ticket.conversation_id,
                    ticket.created_at,
                    ticket.updated_at,
                ],
            )?;
            tx.execute(
                "INSERT INTO ticket_links (ticket_id, message_id, created_at) \
                 VALUES (?1, ?2, ?3)",
                params![ticket.id, message_id, ticket.created_at],
            )?;
            tx.execute(
                "INSERT INTO ticket_history \
                 (ticket_id, action, previous_status, new_status, actor, created_at) \
                 VALUES (?1, ?2, NULL, ?3, 'System', ?4)",
                params![ticket.id, ACTION_CREATED, ticket.status, ticket.created_at],
            )?;

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Update one ticket's status, recording the transition in the history.
///
/// Returns `false` when the ticket does not exist. A no-op transition
/// (same status) is still recorded as a touch event.
pub async fn update_status(
    db: &Database,
    ticket_id: &str,
    new_status: &str,
    actor: &str,
) -> Result<bool, BellhopError> {
    let ticket_id = ticket_id.to_string();
    let new_status = new_status.to_string();
    let actor = actor.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let updated = apply_status_update(&tx, &ticket_id, &new_status, &actor, &now)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Update several tickets to the same status in one transaction, with one
/// history entry per ticket. Unknown ids are skipped. Returns the number
/// of tickets actually updated.
pub async fn update_status_bulk(
    db: &Database,
    ticket_ids: &[String],
    new_status: &str,
    actor: &str,
) -> Result<usize, BellhopError> {
    let ticket_ids = ticket_ids.to_vec();
    let new_status = new_status.to_string();
    let actor = actor.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut updated = 0;
            for ticket_id in &ticket_ids {
                if apply_status_update(&tx, ticket_id, &new_status, &actor, &now)? {
                    updated += 1;
                }
            }
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

fn apply_status_update(
    tx: &rusqlite::Transaction<'_>,
    ticket_id: &str,
    new_status: &str,
    actor: &str,
    now: &str,
) -> Result<bool, rusqlite::Error> {
    let previous_status: Option<String> = tx
        .query_row(
            "SELECT status FROM tickets WHERE id = ?1",
            params![ticket_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(previous_status) = previous_status else {
        return Ok(false);
    };

    tx.execute(
        "UPDATE tickets SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![new_status, now, ticket_id],
    )?;
    tx.execute(
        "INSERT INTO ticket_history \
         (ticket_id, action, previous_status, new_status, actor, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ticket_id,
            ACTION_STATUS_UPDATED,
            previous_status,
            new_status,
            actor,
            now
        ],
    )?;
    Ok(true)
}

/// Get a ticket by id.
pub async fn get(db: &Database, ticket_id: &str) -> Result<Option<Ticket>, BellhopError> {
    let ticket_id = ticket_id.to_string();
    db.connection()
        .call(move |conn| {
            let select = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");
            let ticket = conn
                .query_row(&select, params![ticket_id], row_to_ticket)
                .optional()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}

/// All tickets of a conversation, newest first.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Ticket>, BellhopError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let select = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE conversation_id = ?1 \
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&select)?;
            let tickets = stmt
                .query_map(params![conversation_id], row_to_ticket)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tickets)
        })
        .await
        .map_err(map_tr_err)
}

/// A ticket's full audit trail in chronological order.
pub async fn history(db: &Database, ticket_id: &str) -> Result<Vec<TicketEvent>, BellhopError> {
    let ticket_id = ticket_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ticket_id, action, previous_status, new_status, \
                 previous_assignee, new_assignee, actor, created_at \
                 FROM ticket_history WHERE ticket_id = ?1 ORDER BY id ASC",
            )?;
            let events = stmt
                .query_map(params![ticket_id], |row| {
                    Ok(TicketEvent {
                        id: row.get(0)?,
                        ticket_id: row.get(1)?,
                        action: row.get(2)?,
                        previous_status: row.get(3)?,
                        new_status: row.get(4)?,
                        previous_assignee: row.get(5)?,
                        new_assignee: row.get(6)?,
                        actor: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(events)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations;

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = conversations::get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();
        (db, conversation.id)
    }

    fn make_ticket(id: &str, conversation_id: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            title: "Support Request".to_string(),
            customer_name: "Nimal".to_string(),
            channel: "whatsapp".to_string(),
            kind: "SUPPORT".to_string(),
            status: "New".to_string(),
            priority: "LOW".to_string(),
            body: "printer is jammed".to_string(),
            product_info: None,
            conversation_id: conversation_id.to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_with_link_creates_ticket_and_initial_history() {
        let (db, cid) = setup().await;
        let ticket = make_ticket("t1", &cid);

        let created = insert_with_link(&db, &ticket, "msg-1").await.unwrap();
        assert!(created);

        let loaded = get(&db, "t1").await.unwrap().unwrap();
        assert_eq!(loaded.status, "New");
        assert_eq!(loaded.customer_name, "Nimal");

        let events = history(&db, "t1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ACTION_CREATED);
        assert_eq!(events[0].previous_status, None);
        assert_eq!(events[0].new_status.as_deref(), Some("New"));
        assert_eq!(events[0].actor, "System");
    }

    #[tokio::test]
    async fn duplicate_message_link_is_refused() {
        let (db, cid) = setup().await;
        insert_with_link(&db, &make_ticket("t1", &cid), "msg-1")
            .await
            .unwrap();

        let second = insert_with_link(&db, &make_ticket("t2", &cid), "msg-1")
            .await
            .unwrap();
        assert!(!second);
        assert!(get(&db, "t2").await.unwrap().is_none());

        let linked = find_by_message(&db, "msg-1").await.unwrap().unwrap();
        assert_eq!(linked.id, "t1");
    }

    #[tokio::test]
    async fn update_status_records_transition() {
        let (db, cid) = setup().await;
        insert_with_link(&db, &make_ticket("t1", &cid), "msg-1")
            .await
            .unwrap();

        let found = update_status(&db, "t1", "In Progress", "operator")
            .await
            .unwrap();
        assert!(found);

        let loaded = get(&db, "t1").await.unwrap().unwrap();
        assert_eq!(loaded.status, "In Progress");

        let events = history(&db, "t1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].action, ACTION_STATUS_UPDATED);
        assert_eq!(events[1].previous_status.as_deref(), Some("New"));
        assert_eq!(events[1].new_status.as_deref(), Some("In Progress"));
        assert_eq!(events[1].actor, "operator");
    }

    #[tokio::test]
    async fn update_status_on_missing_ticket_returns_false() {
        let (db, _cid) = setup().await;
        let found = update_status(&db, "nope", "Completed", "System")
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn bulk_update_writes_history_per_ticket() {
        let (db, cid) = setup().await;
        insert_with_link(&db, &make_ticket("t1", &cid), "msg-1")
            .await
            .unwrap();
        insert_with_link(&db, &make_ticket("t2", &cid), "msg-2")
            .await
            .unwrap();

        let ids = vec!["t1".to_string(), "t2".to_string(), "ghost".to_string()];
        let updated = update_status_bulk(&db, &ids, "Completed", "System")
            .await
            .unwrap();
        assert_eq!(updated, 2);

        for id in ["t1", "t2"] {
            let loaded = get(&db, id).await.unwrap().unwrap();
            assert_eq!(loaded.status, "Completed");
            let events = history(&db, id).await.unwrap();
            assert_eq!(events.len(), 2, "each ticket gets its own history row");
            assert_eq!(events[1].new_status.as_deref(), Some("Completed"));
        }
    }

    #[tokio::test]
    async fn list_for_conversation_returns_newest_first() {
        let (db, cid) = setup().await;
        let mut t1 = make_ticket("t1", &cid);
        t1.created_at = "2026-01-01T00:00:00+00:00".to_string();
        let mut t2 = make_ticket("t2", &cid);
        t2.created_at = "2026-01-01T00:05:00+00:00".to_string();
        insert_with_link(&db, &t1, "msg-1").await.unwrap();
        insert_with_link(&db, &t2, "msg-2").await.unwrap();

        let tickets = list_for_conversation(&db, &cid).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].id, "t2");
    }
}
