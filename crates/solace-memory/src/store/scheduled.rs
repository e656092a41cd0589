//! Scheduled message rows: insert, due listing, the atomic claim, and
//! the chaining dedup lookup.

use super::rows::ScheduledMessage;
use super::{db_timestamp, Store};
use chrono::{DateTime, Utc};
use solace_core::error::SolaceError;
use solace_core::types::{MessageType, ScheduleStatus};
use uuid::Uuid;

const SELECT_COLS: &str = "id, user_id, event_id, scheduled_for, message_type, status, \
                           is_fast, created_at, sent_at";

impl Store {
    /// Enqueue a pending scheduled message.
    pub async fn insert_scheduled(
        &self,
        user_id: &str,
        event_id: Option<&str>,
        scheduled_for: DateTime<Utc>,
        message_type: MessageType,
        is_fast: bool,
    ) -> Result<String, SolaceError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO scheduled_messages \
             (id, user_id, event_id, scheduled_for, message_type, status, is_fast) \
             VALUES (?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(event_id)
        .bind(db_timestamp(scheduled_for))
        .bind(message_type.as_str())
        .bind(is_fast)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("insert scheduled failed: {e}")))?;

        Ok(id)
    }

    /// All pending rows whose time has come, oldest first.
    pub async fn list_due_scheduled(&self) -> Result<Vec<ScheduledMessage>, SolaceError> {
        let rows: Vec<ScheduledMessage> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLS} FROM scheduled_messages \
             WHERE status = 'pending' AND datetime(scheduled_for) <= datetime('now') \
             ORDER BY scheduled_for ASC",
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("list due failed: {e}")))?;

        Ok(rows)
    }

    /// Atomically claim a row for processing (pending → processing).
    ///
    /// Only the caller that observes `true` may proceed with side
    /// effects; everyone else must leave the row alone.
    pub async fn claim_scheduled(&self, id: &str) -> Result<bool, SolaceError> {
        let result = sqlx::query(
            "UPDATE scheduled_messages SET status = 'processing' \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("claim failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Release a claim after a transient failure (processing → pending)
    /// so the next tick retries. No-op if the row already reached a
    /// terminal state.
    pub async fn release_scheduled(&self, id: &str) -> Result<(), SolaceError> {
        sqlx::query(
            "UPDATE scheduled_messages SET status = 'pending' \
             WHERE id = ? AND status = 'processing'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("release failed: {e}")))?;

        Ok(())
    }

    /// Move a row to a terminal state. sent/skipped rows are never
    /// touched again: the guard on prior status keeps re-runs no-ops.
    pub async fn mark_scheduled(
        &self,
        id: &str,
        status: ScheduleStatus,
    ) -> Result<(), SolaceError> {
        let sent_at = if status == ScheduleStatus::Sent {
            Some(db_timestamp(Utc::now()))
        } else {
            None
        };

        sqlx::query(
            "UPDATE scheduled_messages SET status = ?, sent_at = COALESCE(?, sent_at) \
             WHERE id = ? AND status IN ('pending', 'processing')",
        )
        .bind(status.as_str())
        .bind(sent_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("mark scheduled failed: {e}")))?;

        Ok(())
    }

    /// Dedup lookup: any row for this user of the given type in one of
    /// the given statuses.
    pub async fn find_scheduled(
        &self,
        user_id: &str,
        message_type: MessageType,
        statuses: &[ScheduleStatus],
    ) -> Result<Option<ScheduledMessage>, SolaceError> {
        if statuses.is_empty() {
            return Ok(None);
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {SELECT_COLS} FROM scheduled_messages \
             WHERE user_id = ? AND message_type = ? AND status IN ({placeholders}) \
             LIMIT 1",
        );

        let mut query = sqlx::query_as::<_, ScheduledMessage>(&sql)
            .bind(user_id)
            .bind(message_type.as_str());
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SolaceError::Memory(format!("find scheduled failed: {e}")))?;

        Ok(row)
    }

    /// All rows for a user (diagnostics and tests), oldest first.
    pub async fn list_scheduled_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ScheduledMessage>, SolaceError> {
        let rows: Vec<ScheduledMessage> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLS} FROM scheduled_messages \
             WHERE user_id = ? ORDER BY scheduled_for ASC, created_at ASC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("list scheduled failed: {e}")))?;

        Ok(rows)
    }
}
