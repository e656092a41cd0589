//! Extracted calendar items.

use super::rows::UserEvent;
use super::{db_timestamp, Store};
use chrono::{DateTime, Utc};
use solace_core::error::SolaceError;
use uuid::Uuid;

impl Store {
    /// Record one extracted event.
    pub async fn insert_event(
        &self,
        user_id: &str,
        checkin_id: &str,
        title: &str,
        event_time: DateTime<Utc>,
        follow_up_at: DateTime<Utc>,
    ) -> Result<String, SolaceError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO user_events (id, user_id, checkin_id, title, event_time, follow_up_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(checkin_id)
        .bind(title)
        .bind(db_timestamp(event_time))
        .bind(db_timestamp(follow_up_at))
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("insert event failed: {e}")))?;

        Ok(id)
    }

    /// Events extracted for a check-in, earliest first.
    pub async fn list_events(
        &self,
        user_id: &str,
        checkin_id: &str,
    ) -> Result<Vec<UserEvent>, SolaceError> {
        let rows: Vec<UserEvent> = sqlx::query_as(
            "SELECT id, user_id, checkin_id, title, event_time, follow_up_at \
             FROM user_events WHERE user_id = ? AND checkin_id = ? \
             ORDER BY event_time ASC",
        )
        .bind(user_id)
        .bind(checkin_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("list events failed: {e}")))?;

        Ok(rows)
    }
}
