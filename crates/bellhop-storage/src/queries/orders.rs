// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation order state persistence.
//!
//! Each conversation has at most one order record, keyed by a fixed
//! `record_key`. Phase transition rules live in `bellhop-orders`; this
//! module only reads and writes the record, last writer wins.

use bellhop_core::BellhopError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::OrderStateRecord;

const RECORD_KEY: &str = "order_state";

/// Fetch the order record for a conversation, if any.
pub async fn get_order_state(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<OrderStateRecord>, BellhopError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let record = conn
                .query_row(
                    "SELECT conversation_id, phase, product, quantity, confirmed, ticket_id, \
                     updated_at \
                     FROM order_states WHERE conversation_id = ?1 AND record_key = ?2",
                    params![conversation_id, RECORD_KEY],
                    |row| {
                        Ok(OrderStateRecord {
                            conversation_id: row.get(0)?,
                            phase: row.get(1)?,
                            product: row.get(2)?,
                            quantity: row.get(3)?,
                            confirmed: row.get::<_, i64>(4)? != 0,
                            ticket_id: row.get(5)?,
                            updated_at: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the order record for a conversation.
pub async fn upsert_order_state(
    db: &Database,
    record: &OrderStateRecord,
) -> Result<(), BellhopError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO order_states \
                 (conversation_id, record_key, phase, product, quantity, confirmed, ticket_id, \
                  updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                 ON CONFLICT(conversation_id, record_key) DO UPDATE SET \
                 phase = excluded.phase, product = excluded.product, \
                 quantity = excluded.quantity, confirmed = excluded.confirmed, \
                 ticket_id = excluded.ticket_id, updated_at = excluded.updated_at",
                params![
                    record.conversation_id,
                    RECORD_KEY,
                    record.phase,
                    record.product,
                    record.quantity,
                    record.confirmed as i64,
                    record.ticket_id,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
