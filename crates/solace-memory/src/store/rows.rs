//! Typed row structs.

use solace_core::types::{MessageType, MoodLabel, TurnRole};
use sqlx::FromRow;

/// A recipient profile. Owned by the external auth service; read-only
/// from the scheduler's perspective.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub city: String,
    pub area: String,
    pub timezone: String,
}

/// One mood-logging session per (user, calendar day).
#[derive(Debug, Clone, FromRow)]
pub struct DailyCheckin {
    pub id: String,
    pub user_id: String,
    pub checkin_date: String,
    pub mood_label: String,
    pub mood_score: i64,
    pub raw_message: String,
    pub created_at: String,
}

impl DailyCheckin {
    /// Parsed mood label, defaulting to okay on unknown values.
    pub fn mood(&self) -> MoodLabel {
        MoodLabel::parse(&self.mood_label).unwrap_or(MoodLabel::Okay)
    }
}

/// Append-only conversation log entry, ordered by `created_at`.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationTurn {
    pub id: String,
    pub user_id: String,
    pub checkin_id: String,
    pub role: String,
    pub message: String,
    pub message_type: String,
    pub created_at: String,
}

impl ConversationTurn {
    /// (role, message_type) view for the trigger predicate. `None` for
    /// rows with unrecognized tags, which the predicate ignores.
    pub fn kind(&self) -> Option<(TurnRole, MessageType)> {
        Some((
            TurnRole::parse(&self.role)?,
            MessageType::parse(&self.message_type)?,
        ))
    }
}

/// An extracted calendar item tied to a check-in.
#[derive(Debug, Clone, FromRow)]
pub struct UserEvent {
    pub id: String,
    pub user_id: String,
    pub checkin_id: String,
    pub title: String,
    pub event_time: String,
    pub follow_up_at: String,
}

/// A pending unit of future work for the poller.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledMessage {
    pub id: String,
    pub user_id: String,
    pub event_id: Option<String>,
    pub scheduled_for: String,
    pub message_type: String,
    pub status: String,
    pub is_fast: bool,
    pub created_at: String,
    pub sent_at: Option<String>,
}

impl ScheduledMessage {
    /// Parsed message type; rows are only written through the enum, so
    /// unknown values indicate external tampering and default to `None`.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::parse(&self.message_type)
    }
}
