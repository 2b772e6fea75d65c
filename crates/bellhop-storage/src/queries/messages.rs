// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.

use bellhop_core::BellhopError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::StoredMessage;

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        direction: row.get(2)?,
        body: row.get(3)?,
        order_info: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a message into the log.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<(), BellhopError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages \
                 (id, conversation_id, direction, body, order_info, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.direction,
                    msg.body,
                    msg.order_info,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` messages of a conversation, in chronological
/// order. rowid breaks ties between messages stored in the same instant.
pub async fn recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: usize,
) -> Result<Vec<StoredMessage>, BellhopError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, direction, body, order_info, created_at \
                 FROM messages WHERE conversation_id = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let mut messages = stmt
                .query_map(params![conversation_id, limit as i64], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// How many messages a conversation holds.
pub async fn count_messages(db: &Database, conversation_id: &str) -> Result<u64, BellhopError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DIRECTION_RECEIVED, DIRECTION_SENT};
    use crate::queries::conversations;

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = conversations::get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();
        (db, conversation.id)
    }

    fn make_msg(id: &str, conversation_id: &str, direction: &str, body: &str, ts: &str) -> StoredMessage {
        StoredMessage {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            direction: direction.to_string(),
            body: body.to_string(),
            order_info: None,
            created_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn recent_messages_returns_chronological_tail() {
        let (db, cid) = setup().await;
        for i in 0..6 {
            let msg = make_msg(
                &format!("m{i}"),
                &cid,
                if i % 2 == 0 { DIRECTION_RECEIVED } else { DIRECTION_SENT },
                &format!("message {i}"),
                &format!("2026-01-01T00:00:0{i}+00:00"),
            );
            insert_message(&db, &msg).await.unwrap();
        }

        let tail = recent_messages(&db, &cid, 4).await.unwrap();
        assert_eq!(tail.len(), 4);
        assert_eq!(tail[0].id, "m2");
        assert_eq!(tail[3].id, "m5");
    }

    #[tokio::test]
    async fn recent_messages_breaks_timestamp_ties_by_insert_order() {
        let (db, cid) = setup().await;
        let ts = "2026-01-01T00:00:00+00:00";
        for i in 0..3 {
            let msg = make_msg(&format!("m{i}"), &cid, DIRECTION_RECEIVED, &format!("{i}"), ts);
            insert_message(&db, &msg).await.unwrap();
        }
        let tail = recent_messages(&db, &cid, 2).await.unwrap();
        assert_eq!(tail[0].id, "m1");
        assert_eq!(tail[1].id, "m2");
    }

    #[tokio::test]
    async fn sent_rows_keep_order_snapshot() {
        let (db, cid) = setup().await;
        let mut msg = make_msg("m1", &cid, DIRECTION_SENT, "order summary", "2026-01-01T00:00:00+00:00");
        msg.order_info = Some(r#"{"product":"cake","quantity":2}"#.to_string());
        insert_message(&db, &msg).await.unwrap();

        let rows = recent_messages(&db, &cid, 10).await.unwrap();
        assert!(rows[0].order_info.as_deref().unwrap().contains("cake"));
    }

    #[tokio::test]
    async fn count_tracks_inserts() {
        let (db, cid) = setup().await;
        assert_eq!(count_messages(&db, &cid).await.unwrap(), 0);
        for i in 0..3 {
            let msg = make_msg(&format!("m{i}"), &cid, DIRECTION_RECEIVED, "hi", "2026-01-01T00:00:00+00:00");
            insert_message(&db, &msg).await.unwrap();
        }
        assert_eq!(count_messages(&db, &cid).await.unwrap(), 3);
    }
}
