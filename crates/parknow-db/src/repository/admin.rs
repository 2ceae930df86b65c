//! # Admin Flag Repository
//!
//! Reads and writes the `admin_flags` table. The rental engine only reads
//! it; the seed binary and the `grant-admin` maintenance command write it.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use parknow_core::AdminFlag;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: SqlitePool,
}

impl AdminRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AdminRepository { pool }
    }

    /// Returns the flag record for a user, if one exists.
    pub async fn get(&self, user_id: &str) -> DbResult<Option<AdminFlag>> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT user_id, is_admin FROM admin_flags WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(user_id, is_admin)| AdminFlag { user_id, is_admin }))
    }

    /// True only when a record exists and its flag is set.
    pub async fn is_admin(&self, user_id: &str) -> DbResult<bool> {
        Ok(self.get(user_id).await?.is_some_and(|flag| flag.is_admin))
    }

    /// Creates or replaces the flag for a user.
    pub async fn set_admin(
        &self,
        user_id: &str,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> DbResult<AdminFlag> {
        sqlx::query(
            r#"
            INSERT INTO admin_flags (user_id, is_admin, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE SET
                is_admin = excluded.is_admin,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(is_admin)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(user_id = %user_id, is_admin, "Admin flag written");

        Ok(AdminFlag {
            user_id: user_id.to_string(),
            is_admin,
        })
    }
}
