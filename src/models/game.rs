use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::DbPool;
use crate::models::participant::{Participant, ParticipantWithUser};
use crate::models::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "game_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    WaitingForPlayers,
    NextPlayerTurn,
    PlayerTurn,
    WaitingForLetter,
    WaitingForWord,
    CheckWinner,
    GameFinished,
}

#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // Fields populated by SELECT * via sqlx
pub struct Game {
    pub id: i64,
    pub chat_id: i64,
    pub state: GameState,
    pub question_id: i64,
    pub revealed_letters: String,
    pub bonus_points: i64,
    pub current_player_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Game with its question and current player eagerly loaded, for callers
/// that dereference them after the query returns.
#[derive(Debug, Clone)]
pub struct GameWithContext {
    pub game: Game,
    pub question: Question,
    pub current_player: Option<ParticipantWithUser>,
}

impl Game {
    pub async fn create(
        pool: &DbPool,
        chat_id: i64,
        state: GameState,
        question_id: i64,
    ) -> Result<Game, sqlx::Error> {
        sqlx::query_as::<_, Game>(
            "INSERT INTO games (chat_id, state, question_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(chat_id)
        .bind(state)
        .bind(question_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Game, sqlx::Error> {
        sqlx::query_as::<_, Game>("SELECT * FROM games WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// The chat's game in any non-terminal state. Application logic keeps
    /// this unique per chat.
    pub async fn find_running(pool: &DbPool, chat_id: i64) -> Result<Option<Game>, sqlx::Error> {
        sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE chat_id = $1 AND state != 'game_finished'
             ORDER BY id DESC LIMIT 1",
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_with_context(pool: &DbPool, id: i64) -> Result<GameWithContext, sqlx::Error> {
        let game = Self::find_by_id(pool, id).await?;
        let question = Question::find_by_id(pool, game.question_id).await?;
        let current_player = match game.current_player_id {
            Some(pid) => Participant::find_with_user(pool, pid).await.ok(),
            None => None,
        };
        Ok(GameWithContext {
            game,
            question,
            current_player,
        })
    }

    pub async fn update_state(pool: &DbPool, id: i64, state: GameState) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE games SET state = $1, updated_at = NOW() WHERE id = $2")
            .bind(state)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_bonus_points(pool: &DbPool, id: i64, bonus: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE games SET bonus_points = $1, updated_at = NOW() WHERE id = $2")
            .bind(bonus)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Append-if-absent, so a redelivered guess cannot duplicate a letter.
    pub async fn add_revealed_letter(
        pool: &DbPool,
        id: i64,
        letter: char,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE games SET revealed_letters = revealed_letters || $1, updated_at = NOW()
             WHERE id = $2 AND position($1 in revealed_letters) = 0",
        )
        .bind(letter.to_string())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_current_player(
        pool: &DbPool,
        id: i64,
        participant_id: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE games SET current_player_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(participant_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
