use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // Fields populated by SELECT * via sqlx
pub struct User {
    pub id: i64,
    pub tg_user_id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_tg_id(pool: &DbPool, tg_user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE tg_user_id = $1")
            .bind(tg_user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &DbPool,
        tg_user_id: i64,
        username: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (tg_user_id, username, first_name, last_name)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(tg_user_id)
        .bind(username)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(pool)
        .await
    }

    /// Upsert on first encountered participation.
    pub async fn find_or_create(
        pool: &DbPool,
        tg_user_id: i64,
        username: &str,
    ) -> Result<User, sqlx::Error> {
        if let Some(user) = Self::find_by_tg_id(pool, tg_user_id).await? {
            return Ok(user);
        }
        Self::create(pool, tg_user_id, username, None, None).await
    }
}
