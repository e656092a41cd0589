//! Recipient profile lookup.

use super::rows::User;
use super::Store;
use solace_core::error::SolaceError;

impl Store {
    /// Look up a user by id.
    pub async fn find_user(&self, id: &str) -> Result<Option<User>, SolaceError> {
        let row: Option<User> = sqlx::query_as(
            "SELECT id, name, email, age, city, area, timezone FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("find user failed: {e}")))?;

        Ok(row)
    }

    /// Insert or replace a profile. Used by provisioning and tests; the
    /// scheduler itself never writes here.
    pub async fn upsert_user(&self, user: &User) -> Result<(), SolaceError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, age, city, area, timezone) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 name = excluded.name, email = excluded.email, age = excluded.age, \
                 city = excluded.city, area = excluded.area, timezone = excluded.timezone",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.age)
        .bind(&user.city)
        .bind(&user.area)
        .bind(&user.timezone)
        .execute(&self.pool)
        .await
        .map_err(|e| SolaceError::Memory(format!("upsert user failed: {e}")))?;

        Ok(())
    }
}
