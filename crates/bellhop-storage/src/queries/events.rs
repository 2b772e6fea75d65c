// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook dedup and the operational error log.

use bellhop_core::BellhopError;
use chrono::{Duration, Utc};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::ErrorEntry;

/// Record a provider message id as processed.
///
/// Returns `true` if the id was new, `false` if this is a redelivery.
pub async fn mark_processed(db: &Database, event_id: &str) -> Result<bool, BellhopError> {
    let event_id = event_id.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO processed_events (event_id, seen_at) VALUES (?1, ?2)",
                params![event_id, now],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Drop dedup entries older than `max_age_hours` so the table stays
/// bounded. Providers stop redelivering long before this horizon.
pub async fn prune_processed_events(
    db: &Database,
    max_age_hours: u32,
) -> Result<usize, BellhopError> {
    let cutoff = (Utc::now() - Duration::hours(max_age_hours as i64)).to_rfc3339();
    db.connection()
        .call(move |conn| {
            let pruned = conn.execute(
                "DELETE FROM processed_events WHERE seen_at < ?1",
                params![cutoff],
            )?;
            Ok(pruned)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a pipeline failure to the error log so an operator can review it.
pub async fn record_error(
    db: &Database,
    component: &str,
    severity: &str,
    message: &str,
    metadata: Option<&str>,
) -> Result<(), BellhopError> {
    let component = component.to_string();
    let severity = severity.to_string();
    let message = message.to_string();
    let metadata = metadata.map(|s| s.to_string());
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO error_log (component, severity, message, metadata, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![component, severity, message, metadata, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent error log entries, newest first.
pub async fn recent_errors(db: &Database, limit: usize) -> Result<Vec<ErrorEntry>, BellhopError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, component, severity, message, metadata, created_at \
                 FROM error_log ORDER BY id DESC LIMIT ?1",
            )?;
            let entries = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(ErrorEntry {
                        id: row.get(0)?,
                        component: row.get(1)?,
                        severity: row.get(2)?,
                        message: row.get(3)?,
                        metadata: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_mark_is_new_second_is_redelivery() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(mark_processed(&db, "wamid.1").await.unwrap());
        assert!(!mark_processed(&db, "wamid.1").await.unwrap());
        // A different id is independent.
        assert!(mark_processed(&db, "wamid.2").await.unwrap());
    }

    #[tokio::test]
    async fn prune_drops_only_old_entries() {
        let db = Database::open_in_memory().await.unwrap();
        mark_processed(&db, "wamid.fresh").await.unwrap();
        let stale = (Utc::now() - Duration::hours(48)).to_rfc3339();
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO processed_events (event_id, seen_at) VALUES ('wamid.old', ?1)",
                    params![stale],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let pruned = prune_processed_events(&db, 24).await.unwrap();
        assert_eq!(pruned, 1);
        // The fresh id still dedups; the old one is forgotten.
        assert!(!mark_processed(&db, "wamid.fresh").await.unwrap());
        assert!(mark_processed(&db, "wamid.old").await.unwrap());
    }

    #[tokio::test]
    async fn error_log_round_trips_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        record_error(&db, "model", "error", "timeout after 30s", Some(r#"{"conversation":"conv-1"}"#))
            .await
            .unwrap();
        record_error(&db, "channel", "warn", "send failed: 503", None)
            .await
            .unwrap();

        let entries = recent_errors(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].component, "channel");
        assert_eq!(entries[0].severity, "warn");
        assert_eq!(entries[1].component, "model");
        assert!(entries[1].metadata.as_deref().unwrap().contains("conv-1"));
    }
}
