// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookup and upkeep.

use bellhop_core::BellhopError;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::{map_tr_err, Database};
use crate::models::Conversation;

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        channel: row.get(1)?,
        contact_id: row.get(2)?,
        contact_name: row.get(3)?,
        ai_enabled: row.get::<_, i64>(4)? != 0,
        memory_length: row.get(5)?,
        memory_timeout_hours: row.get(6)?,
        last_context_update: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const CONVERSATION_COLUMNS: &str = "id, channel, contact_id, contact_name, ai_enabled, \
     memory_length, memory_timeout_hours, last_context_update, created_at, updated_at";

/// Look up the conversation for a (channel, contact) pair, creating it with
/// the configured defaults if it does not exist yet.
///
/// A known contact's display name is refreshed when the channel supplies
/// one; a missing name never overwrites a stored one.
pub async fn get_or_create(
    db: &Database,
    channel: &str,
    contact_id: &str,
    contact_name: Option<&str>,
    default_memory_length: u32,
    default_timeout_hours: u32,
) -> Result<Conversation, BellhopError> {
    let channel = channel.to_string();
    let contact_id = contact_id.to_string();
    let contact_name = contact_name.map(|s| s.to_string());
    let new_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    db.connection()
        .call(move |conn| {
            let select = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations \
                 WHERE channel = ?1 AND contact_id = ?2"
            );
            let existing = conn
                .query_row(&select, params![channel, contact_id], row_to_conversation)
                .optional()?;

            match existing {
                Some(conversation) => {
                    if let Some(name) = &contact_name {
                        if conversation.contact_name.as_deref() != Some(name.as_str()) {
                            conn.execute(
                                "UPDATE conversations SET contact_name = ?1, updated_at = ?2 \
                                 WHERE id = ?3",
                                params![name, now, conversation.id],
                            )?;
                            return Ok(Conversation {
                                contact_name: Some(name.clone()),
                                updated_at: now,
                                ..conversation
                            });
                        }
                    }
                    Ok(conversation)
                }
                None => {
                    conn.execute(
                        "INSERT INTO conversations \
                         (id, channel, contact_id, contact_name, ai_enabled, memory_length, \
                          memory_timeout_hours, last_context_update, created_at, updated_at) \
                         VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?7, ?7)",
                        params![
                            new_id,
                            channel,
                            contact_id,
                            contact_name,
                            default_memory_length,
                            default_timeout_hours,
                            now,
                        ],
                    )?;
                    Ok(Conversation {
                        id: new_id,
                        channel,
                        contact_id,
                        contact_name,
                        ai_enabled: true,
                        memory_length: default_memory_length,
                        memory_timeout_hours: default_timeout_hours,
                        last_context_update: now.clone(),
                        created_at: now.clone(),
                        updated_at: now,
                    })
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, BellhopError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let select =
                format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            let conversation = conn
                .query_row(&select, params![id], row_to_conversation)
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Record that a turn was just completed for this conversation.
pub async fn touch_context(db: &Database, conversation_id: &str) -> Result<(), BellhopError> {
    let conversation_id = conversation_id.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET last_context_update = ?1, updated_at = ?1 \
                 WHERE id = ?2",
                params![now, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Turn automated replies on or off for one conversation.
pub async fn set_ai_enabled(
    db: &Database,
    conversation_id: &str,
    enabled: bool,
) -> Result<(), BellhopError> {
    let conversation_id = conversation_id.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET ai_enabled = ?1, updated_at = ?2 WHERE id = ?3",
                params![enabled as i64, now, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_conversation_with_defaults() {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = get_or_create(&db, "whatsapp", "+9477001", Some("Nimal"), 3, 2)
            .await
            .unwrap();
        assert_eq!(conversation.channel, "whatsapp");
        assert_eq!(conversation.contact_id, "+9477001");
        assert_eq!(conversation.contact_name.as_deref(), Some("Nimal"));
        assert!(conversation.ai_enabled);
        assert_eq!(conversation.memory_length, 3);
        assert_eq!(conversation.memory_timeout_hours, 2);
    }

    #[tokio::test]
    async fn second_call_returns_same_conversation() {
        let db = Database::open_in_memory().await.unwrap();
        let first = get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();
        let second = get_or_create(&db, "whatsapp", "+9477001", None, 5, 6)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        // Defaults only apply at creation time.
        assert_eq!(second.memory_length, 3);
    }

    #[tokio::test]
    async fn same_contact_on_different_channel_is_distinct() {
        let db = Database::open_in_memory().await.unwrap();
        let wa = get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();
        let tg = get_or_create(&db, "telegram", "+9477001", None, 3, 2)
            .await
            .unwrap();
        assert_ne!(wa.id, tg.id);
    }

    #[tokio::test]
    async fn refreshes_contact_name_but_never_clears_it() {
        let db = Database::open_in_memory().await.unwrap();
        let created = get_or_create(&db, "whatsapp", "+9477001", Some("Nimal"), 3, 2)
            .await
            .unwrap();

        let renamed = get_or_create(&db, "whatsapp", "+9477001", Some("Nimal P."), 3, 2)
            .await
            .unwrap();
        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.contact_name.as_deref(), Some("Nimal P."));

        let unnamed = get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();
        assert_eq!(unnamed.contact_name.as_deref(), Some("Nimal P."));
    }

    #[tokio::test]
    async fn touch_context_advances_timestamp() {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();

        touch_context(&db, &conversation.id).await.unwrap();
        let after = get(&db, &conversation.id).await.unwrap().unwrap();
        assert!(after.last_context_update >= conversation.last_context_update);
    }

    #[tokio::test]
    async fn ai_toggle_round_trips() {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = get_or_create(&db, "whatsapp", "+9477001", None, 3, 2)
            .await
            .unwrap();

        set_ai_enabled(&db, &conversation.id, false).await.unwrap();
        let after = get(&db, &conversation.id).await.unwrap().unwrap();
        assert!(!after.ai_enabled);
    }
}
