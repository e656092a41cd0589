//! Daily check-in creation and lookup.

use super::rows::DailyCheckin;
use super::Store;
use solace_core::error::SolaceError;
use solace_core::types::MoodLabel;
use uuid::Uuid;

impl Store {
    /// Get or create the check-in for (user, date).
    ///
    /// The UNIQUE(user_id, checkin_date) constraint makes this safe
    /// under concurrent first messages: INSERT OR IGNORE then re-read.
    /// Returns the row plus whether this call created it.
    pub async fn get_or_create_checkin(
        &self,
        user_id: &str,
        date: &str,
        mood: MoodLabel,
        mood_score: i64,
        raw_message: &str,
    ) -> Result<(DailyCheckin, bool), SolaceError> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO daily_checkins \
             (id, user_id, checkin_date, mood_label, mood_score, raw_message) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(date)
        .bind(mood.as_str())
        .bind(mood_score)
        .bind(raw_message)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("insert checkin failed: {e}")))?;

        let created = result.rows_affected() > 0;

        let row = self
            .find_checkin_by_date(user_id, date)
            .await?
            .ok_or_else(|| SolaceError::Memory("checkin vanished after insert".to_string()))?;

        Ok((row, created))
    }

    /// Find the check-in for a specific date.
    pub async fn find_checkin_by_date(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyCheckin>, SolaceError> {
        let row: Option<DailyCheckin> = sqlx::query_as(
            "SELECT id, user_id, checkin_date, mood_label, mood_score, raw_message, created_at \
             FROM daily_checkins WHERE user_id = ? AND checkin_date = ?",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("find checkin failed: {e}")))?;

        Ok(row)
    }

    /// Most recent check-in regardless of date.
    ///
    /// Deliberately not filtered to today: a user who checked in
    /// yesterday but not today still resolves, so queued nudges fire
    /// against yesterday's mood and check-in id.
    pub async fn find_latest_checkin(
        &self,
        user_id: &str,
    ) -> Result<Option<DailyCheckin>, SolaceError> {
        let row: Option<DailyCheckin> = sqlx::query_as(
            "SELECT id, user_id, checkin_date, mood_label, mood_score, raw_message, created_at \
             FROM daily_checkins WHERE user_id = ? \
             ORDER BY checkin_date DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("find latest checkin failed: {e}")))?;

        Ok(row)
    }
}
