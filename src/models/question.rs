use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // Fields populated by SELECT * via sqlx
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub async fn create(pool: &DbPool, question: &str, answer: &str) -> Result<Question, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            "INSERT INTO questions (question, answer) VALUES ($1, $2) RETURNING *",
        )
        .bind(question)
        .bind(answer)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Question, sqlx::Error> {
        sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Uniform pick; `None` when the table is empty.
    pub async fn random(pool: &DbPool) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>("SELECT * FROM questions ORDER BY random() LIMIT 1")
            .fetch_optional(pool)
            .await
    }
}
