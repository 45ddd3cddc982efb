use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::DbPool;
use crate::error::BotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "participant_state", rename_all = "snake_case")]
pub enum ParticipantState {
    Waiting,
    ActiveTurn,
    Winner,
    Loser,
    Left,
}

#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // Fields populated by SELECT * via sqlx
pub struct Participant {
    pub id: i64,
    pub game_id: i64,
    pub user_id: i64,
    pub state: ParticipantState,
    pub turn_order: i32,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Participant with its user resolved via JOIN.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantWithUser {
    pub id: i64,
    pub game_id: i64,
    pub user_id: i64,
    pub state: ParticipantState,
    pub turn_order: i32,
    pub points: i64,
    pub tg_user_id: i64,
    pub username: String,
}

const WITH_USER_COLUMNS: &str =
    "p.id, p.game_id, p.user_id, p.state, p.turn_order, p.points, u.tg_user_id, u.username";

impl Participant {
    /// A second join of the same user into the same game surfaces as
    /// `AlreadyRegistered`, not a database error.
    pub async fn create(
        pool: &DbPool,
        game_id: i64,
        user_id: i64,
        turn_order: i32,
    ) -> Result<Participant, BotError> {
        let result = sqlx::query_as::<_, Participant>(
            "INSERT INTO game_participants (game_id, user_id, turn_order)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(game_id)
        .bind(user_id)
        .bind(turn_order)
        .fetch_one(pool)
        .await;

        match result {
            Ok(participant) => Ok(participant),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(BotError::AlreadyRegistered)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn count_by_game(pool: &DbPool, game_id: i64) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM game_participants WHERE game_id = $1")
                .bind(game_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    pub async fn find_by_game_with_users(
        pool: &DbPool,
        game_id: i64,
    ) -> Result<Vec<ParticipantWithUser>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantWithUser>(&format!(
            "SELECT {WITH_USER_COLUMNS} FROM game_participants p
             JOIN users u ON p.user_id = u.id
             WHERE p.game_id = $1 ORDER BY p.turn_order ASC",
        ))
        .bind(game_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_with_user(
        pool: &DbPool,
        id: i64,
    ) -> Result<ParticipantWithUser, sqlx::Error> {
        sqlx::query_as::<_, ParticipantWithUser>(&format!(
            "SELECT {WITH_USER_COLUMNS} FROM game_participants p
             JOIN users u ON p.user_id = u.id
             WHERE p.id = $1",
        ))
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_active(
        pool: &DbPool,
        game_id: i64,
    ) -> Result<Option<ParticipantWithUser>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantWithUser>(&format!(
            "SELECT {WITH_USER_COLUMNS} FROM game_participants p
             JOIN users u ON p.user_id = u.id
             WHERE p.game_id = $1 AND p.state = 'active_turn'",
        ))
        .bind(game_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_state(
        pool: &DbPool,
        id: i64,
        state: ParticipantState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE game_participants SET state = $1, updated_at = NOW() WHERE id = $2")
            .bind(state)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_state_many(
        pool: &DbPool,
        ids: &[i64],
        state: ParticipantState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE game_participants SET state = $1, updated_at = NOW() WHERE id = ANY($2)",
        )
        .bind(state)
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn add_points(pool: &DbPool, id: i64, points: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE game_participants SET points = points + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(points)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
