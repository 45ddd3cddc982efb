//! Entry and update actions for the seven game states. Each action returns
//! the state to move to next (`None` to settle); the FSM drives the chain
//! so the actions themselves never recurse.

use std::time::Duration;

use rand::RngExt;

use crate::error::BotError;
use crate::models::game::{Game, GameState};
use crate::models::participant::{Participant, ParticipantState, ParticipantWithUser};
use crate::services::fsm::{Fsm, FsmInner};
use crate::services::words::LetterOutcome;
use crate::services::{messages, wheel, words};
use crate::telegram::client;

pub(crate) const JOIN_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const TURN_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) async fn enter(
    fsm: &Fsm,
    inner: &mut FsmInner,
    state: GameState,
) -> Result<Option<GameState>, BotError> {
    match state {
        GameState::WaitingForPlayers => enter_waiting_for_players(fsm, inner).await,
        GameState::NextPlayerTurn => enter_next_player_turn(fsm, inner).await,
        GameState::PlayerTurn => enter_player_turn(fsm, inner).await,
        GameState::WaitingForLetter | GameState::WaitingForWord => {
            enter_waiting_for_guess(fsm, inner, state).await
        }
        GameState::CheckWinner => enter_check_winner(fsm).await,
        GameState::GameFinished => enter_game_finished(fsm, inner).await,
    }
}

async fn enter_waiting_for_players(
    fsm: &Fsm,
    inner: &mut FsmInner,
) -> Result<Option<GameState>, BotError> {
    fsm.store
        .tg
        .send_keyboard(fsm.chat_id, messages::JOIN_PROMPT, client::join_keyboard())
        .await?;
    if let Some(handle) = fsm.weak.upgrade() {
        inner
            .timer
            .start(JOIN_TIMEOUT, async move { handle.handle_join_timeout().await });
    }
    Ok(None)
}

pub(crate) async fn update_waiting_for_players(
    fsm: &Fsm,
    _inner: &mut FsmInner,
) -> Result<Option<GameState>, BotError> {
    let count = Participant::count_by_game(&fsm.store.db, fsm.game_id).await?;
    let min_players = fsm.store.config.game.min_number_of_participants;
    fsm.store
        .tg
        .send_message(fsm.chat_id, &messages::players_connected(count, min_players))
        .await?;
    if count >= min_players {
        Ok(Some(GameState::NextPlayerTurn))
    } else {
        Ok(None)
    }
}

/// Hand the turn over: random choice when the game has no current player
/// yet, round-robin by `turn_order` otherwise.
async fn enter_next_player_turn(
    fsm: &Fsm,
    inner: &mut FsmInner,
) -> Result<Option<GameState>, BotError> {
    let db = &fsm.store.db;
    let game = Game::find_by_id(db, fsm.game_id).await?;
    let players = Participant::find_by_game_with_users(db, fsm.game_id).await?;

    let current = game
        .current_player_id
        .and_then(|pid| players.iter().position(|p| p.id == pid));
    let next = match current {
        Some(idx) => words::next_waiting_after(&players, idx),
        None => {
            let waiting = words::waiting_indices(&players);
            if waiting.is_empty() {
                None
            } else {
                Some(waiting[rand::rng().random_range(0..waiting.len())])
            }
        }
    };
    let Some(next_idx) = next else {
        // Nobody is waiting for a turn; let the winner check settle it.
        return Ok(Some(GameState::CheckWinner));
    };

    if let Some(idx) = current {
        // Demote only a still-active player; one who left or lost keeps
        // that state.
        if players[idx].state == ParticipantState::ActiveTurn {
            Participant::set_state(db, players[idx].id, ParticipantState::Waiting).await?;
        }
    }
    Participant::set_state(db, players[next_idx].id, ParticipantState::ActiveTurn).await?;
    Game::set_current_player(db, fsm.game_id, Some(players[next_idx].id)).await?;

    inner.current_player_tg_id = Some(players[next_idx].tg_user_id);
    inner.current_player_username = Some(players[next_idx].username.clone());
    Ok(Some(GameState::PlayerTurn))
}

async fn enter_player_turn(fsm: &Fsm, inner: &mut FsmInner) -> Result<Option<GameState>, BotError> {
    let db = &fsm.store.db;
    let Some(player) = Participant::find_active(db, fsm.game_id).await? else {
        return Ok(Some(GameState::CheckWinner));
    };
    let context = Game::find_with_context(db, fsm.game_id).await?;

    let masked = words::mask_word(&context.question.answer, &context.game.revealed_letters);
    let game_config = &fsm.store.config.game;
    let bonus = wheel::spin(&game_config.wheel_sectors, &game_config.sector_weights);
    Game::update_bonus_points(db, fsm.game_id, bonus).await?;

    inner.bonus_points = bonus;
    inner.current_player_tg_id = Some(player.tg_user_id);
    inner.current_player_username = Some(player.username.clone());

    fsm.store
        .tg
        .send_keyboard(
            fsm.chat_id,
            &messages::turn_announcement(&player.username, &masked, bonus),
            client::turn_keyboard(),
        )
        .await?;
    start_turn_timer(fsm, inner, GameState::PlayerTurn);
    Ok(None)
}

async fn enter_waiting_for_guess(
    fsm: &Fsm,
    inner: &mut FsmInner,
    state: GameState,
) -> Result<Option<GameState>, BotError> {
    let username = inner.current_player_username.clone().unwrap_or_default();
    let prompt = if state == GameState::WaitingForLetter {
        messages::prompt_letter(&username)
    } else {
        messages::prompt_word(&username)
    };
    fsm.store.tg.send_message(fsm.chat_id, &prompt).await?;
    start_turn_timer(fsm, inner, state);
    Ok(None)
}

pub(crate) async fn update_waiting_for_letter(
    fsm: &Fsm,
    inner: &mut FsmInner,
    text: &str,
) -> Result<Option<GameState>, BotError> {
    let db = &fsm.store.db;
    let context = Game::find_with_context(db, fsm.game_id).await?;
    let outcome = words::evaluate_letter(
        &context.question.answer,
        &context.game.revealed_letters,
        text,
    );

    match outcome {
        LetterOutcome::NotALetter => {
            fsm.store.tg.send_message(fsm.chat_id, messages::NOT_A_LETTER).await?;
            Ok(Some(GameState::NextPlayerTurn))
        }
        LetterOutcome::AlreadyNamed => {
            fsm.store
                .tg
                .send_message(fsm.chat_id, messages::LETTER_ALREADY_NAMED)
                .await?;
            Ok(Some(GameState::NextPlayerTurn))
        }
        LetterOutcome::Miss { letter } => {
            Game::add_revealed_letter(db, fsm.game_id, letter).await?;
            fsm.store.tg.send_message(fsm.chat_id, messages::LETTER_MISS).await?;
            Ok(Some(GameState::NextPlayerTurn))
        }
        LetterOutcome::Hit {
            letter,
            occurrences,
            guessed,
        } => {
            Game::add_revealed_letter(db, fsm.game_id, letter).await?;
            let Some(player) = Participant::find_active(db, fsm.game_id).await? else {
                return Ok(Some(GameState::CheckWinner));
            };
            let points = inner.bonus_points * occurrences as i64;
            Participant::add_points(db, player.id, points).await?;
            fsm.store
                .tg
                .send_message(fsm.chat_id, &messages::letter_hit(points))
                .await?;
            if guessed {
                Participant::set_state(db, player.id, ParticipantState::Winner).await?;
                Ok(Some(GameState::GameFinished))
            } else {
                // Same player spins and guesses again.
                Ok(Some(GameState::PlayerTurn))
            }
        }
    }
}

pub(crate) async fn update_waiting_for_word(
    fsm: &Fsm,
    inner: &mut FsmInner,
    text: &str,
) -> Result<Option<GameState>, BotError> {
    let db = &fsm.store.db;
    let context = Game::find_with_context(db, fsm.game_id).await?;
    let Some(player) = Participant::find_active(db, fsm.game_id).await? else {
        return Ok(Some(GameState::CheckWinner));
    };

    if words::is_word_match(&context.question.answer, text) {
        Participant::add_points(db, player.id, inner.bonus_points).await?;
        Participant::set_state(db, player.id, ParticipantState::Winner).await?;
        fsm.store
            .tg
            .send_message(fsm.chat_id, &messages::word_guessed(&player.username))
            .await?;
        Ok(Some(GameState::GameFinished))
    } else {
        Participant::set_state(db, player.id, ParticipantState::Loser).await?;
        fsm.store
            .tg
            .send_message(fsm.chat_id, &messages::wrong_word(&player.username))
            .await?;
        Ok(Some(GameState::CheckWinner))
    }
}

async fn enter_check_winner(fsm: &Fsm) -> Result<Option<GameState>, BotError> {
    let players = Participant::find_by_game_with_users(&fsm.store.db, fsm.game_id).await?;
    let alive: Vec<&ParticipantWithUser> = players
        .iter()
        .filter(|p| {
            matches!(
                p.state,
                ParticipantState::ActiveTurn | ParticipantState::Waiting
            )
        })
        .collect();
    match alive.as_slice() {
        [] => Ok(Some(GameState::GameFinished)),
        [last] => {
            Participant::set_state(&fsm.store.db, last.id, ParticipantState::Winner).await?;
            Ok(Some(GameState::GameFinished))
        }
        _ => Ok(Some(GameState::NextPlayerTurn)),
    }
}

/// Finalize: settle leftover participant states, broadcast the scoreboard
/// when there is a winner, and drop the FSM from the registry.
async fn enter_game_finished(
    fsm: &Fsm,
    inner: &mut FsmInner,
) -> Result<Option<GameState>, BotError> {
    let db = &fsm.store.db;
    let context = Game::find_with_context(db, fsm.game_id).await?;
    let players = Participant::find_by_game_with_users(db, fsm.game_id).await?;

    let waiting: Vec<i64> = players
        .iter()
        .filter(|p| p.state == ParticipantState::Waiting)
        .map(|p| p.id)
        .collect();

    match players.iter().find(|p| p.state == ParticipantState::Winner) {
        None => {
            // Ended before anyone could win (not enough players, everyone
            // gone). Release the stragglers and end quietly.
            if !waiting.is_empty() {
                Participant::set_state_many(db, &waiting, ParticipantState::Left).await?;
            }
        }
        Some(winner) => {
            if !waiting.is_empty() {
                Participant::set_state_many(db, &waiting, ParticipantState::Loser).await?;
            }
            let mut losers: Vec<&ParticipantWithUser> =
                players.iter().filter(|p| p.id != winner.id).collect();
            losers.sort_by(|a, b| b.points.cmp(&a.points));
            fsm.store
                .tg
                .send_message(
                    fsm.chat_id,
                    &messages::scoreboard(&context.question.answer, winner, &losers),
                )
                .await?;
        }
    }

    inner.timer.cancel();
    inner.current_player_tg_id = None;
    inner.current_player_username = None;

    fsm.store.registry.remove(fsm.chat_id).await;
    fsm.store.metrics.active_games.dec();
    fsm.store.metrics.active_players.sub(players.len() as i64);
    tracing::info!(chat_id = fsm.chat_id, game_id = fsm.game_id, "game finished");
    Ok(None)
}

fn start_turn_timer(fsm: &Fsm, inner: &mut FsmInner, expected: GameState) {
    let Some(handle) = fsm.weak.upgrade() else {
        return;
    };
    inner.timer.start(TURN_TIMEOUT, async move {
        handle.handle_turn_timeout(expected).await;
    });
}
