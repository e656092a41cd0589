//! Append-only conversation log.

use super::rows::ConversationTurn;
use super::Store;
use solace_core::error::SolaceError;
use solace_core::types::{MessageType, TurnRole};
use uuid::Uuid;

impl Store {
    /// Append one turn. Turns are never updated or deleted.
    pub async fn insert_turn(
        &self,
        user_id: &str,
        checkin_id: &str,
        role: TurnRole,
        message: &str,
        message_type: MessageType,
    ) -> Result<String, SolaceError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO conversation_turns (id, user_id, checkin_id, role, message, message_type) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(checkin_id)
        .bind(role.as_str())
        .bind(message)
        .bind(message_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("insert turn failed: {e}")))?;

        Ok(id)
    }

    /// Append the night recommendation turn if none exists yet for this
    /// (user, checkin). Returns `false` when the partial unique index
    /// swallowed the insert — the caller must then skip the email too.
    pub async fn try_insert_recommendation_turn(
        &self,
        user_id: &str,
        checkin_id: &str,
        message: &str,
    ) -> Result<bool, SolaceError> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO conversation_turns \
             (id, user_id, checkin_id, role, message, message_type) \
             VALUES (?, ?, ?, 'assistant', ?, 'night_recommendation')",
        )
        .bind(&id)
        .bind(user_id)
        .bind(checkin_id)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("insert recommendation failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Full ordered history for (user, checkin). The rowid tiebreak
    /// keeps same-millisecond inserts in write order.
    pub async fn list_turns(
        &self,
        user_id: &str,
        checkin_id: &str,
    ) -> Result<Vec<ConversationTurn>, SolaceError> {
        let rows: Vec<ConversationTurn> = sqlx::query_as(
            "SELECT id, user_id, checkin_id, role, message, message_type, created_at \
             FROM conversation_turns \
             WHERE user_id = ? AND checkin_id = ? \
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .bind(checkin_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("list turns failed: {e}")))?;

        Ok(rows)
    }
}
