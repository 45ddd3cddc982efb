//! Thin command routers: guard, answer the button press, then hand the
//! chat's FSM the actual work.

use std::sync::Arc;

use crate::Store;
use crate::error::BotError;
use crate::models::game::{Game, GameState};
use crate::models::participant::{Participant, ParticipantState};
use crate::models::question::Question;
use crate::models::user::User;
use crate::services::fsm::Fsm;
use crate::services::messages;
use crate::telegram::client;
use crate::telegram::types::{CallbackQuery, Message, Update, UpdateBody};

pub async fn dispatch(store: &Store, update: &Update) -> Result<(), BotError> {
    match &update.body {
        UpdateBody::CallbackQuery(cb) => match cb.command.as_str() {
            "/start" => start(store, cb).await,
            "/join" => join(store, cb).await,
            "/leave_game" => leave_game(store, cb).await,
            "/say_letter" => say_letter(store, cb).await,
            "/say_word" => say_word(store, cb).await,
            other => {
                tracing::debug!(command = other, chat_id = cb.chat_id, "unknown command");
                store.tg.answer_callback(&cb.callback_id, "").await
            }
        },
        UpdateBody::Message(msg) => text_message(store, msg).await,
    }
}

fn log_callback(handler: &str, cb: &CallbackQuery) {
    tracing::info!(
        handler,
        from_username = %cb.from_username,
        command = %cb.command,
        chat_id = cb.chat_id,
        "callback received",
    );
}

/// Start a new game, or re-adopt a running one left over from a restart.
async fn start(store: &Store, cb: &CallbackQuery) -> Result<(), BotError> {
    log_callback("start", cb);
    if store.registry.get(cb.chat_id).await.is_some() {
        return store
            .tg
            .answer_callback(&cb.callback_id, messages::GAME_ALREADY_RUNNING)
            .await;
    }

    if let Some(game) = Game::find_running(&store.db, cb.chat_id).await? {
        let context = Game::find_with_context(&store.db, game.id).await?;
        let count = Participant::count_by_game(&store.db, game.id).await?;
        let fsm = Fsm::new(store.clone(), cb.chat_id, game.id);
        store.registry.insert(cb.chat_id, fsm.clone()).await;
        store.metrics.active_games.inc();
        store.metrics.active_players.add(count);
        tracing::info!(game_id = game.id, chat_id = cb.chat_id, "restoring running game");
        store
            .tg
            .answer_callback(&cb.callback_id, messages::GAME_RESTORED)
            .await?;
        fsm.restore_current_state(&context).await
    } else {
        let Some(question) = Question::random(&store.db).await? else {
            tracing::error!(chat_id = cb.chat_id, "{}", BotError::QuestionNotFound);
            return store
                .tg
                .answer_callback(&cb.callback_id, messages::NO_QUESTIONS)
                .await;
        };
        let game =
            Game::create(&store.db, cb.chat_id, GameState::WaitingForPlayers, question.id).await?;
        let fsm = Fsm::new(store.clone(), cb.chat_id, game.id);
        store.registry.insert(cb.chat_id, fsm.clone()).await;
        store.metrics.active_games.inc();
        tracing::info!(game_id = game.id, chat_id = cb.chat_id, "starting new game");
        store
            .tg
            .answer_callback(&cb.callback_id, messages::GAME_STARTED)
            .await?;
        fsm.set_current_state(GameState::WaitingForPlayers).await
    }
}

async fn join(store: &Store, cb: &CallbackQuery) -> Result<(), BotError> {
    log_callback("join", cb);
    let Some(fsm) = store.registry.get(cb.chat_id).await else {
        return store
            .tg
            .answer_callback(&cb.callback_id, messages::NO_ACTIVE_GAME)
            .await;
    };
    if fsm.current_state().await != Some(GameState::WaitingForPlayers) {
        return store
            .tg
            .answer_callback(&cb.callback_id, messages::WRONG_STAGE)
            .await;
    }

    let user = User::find_or_create(&store.db, cb.from_id, &cb.from_username).await?;
    let count = Participant::count_by_game(&store.db, fsm.game_id).await?;
    match Participant::create(&store.db, fsm.game_id, user.id, count as i32).await {
        Ok(_) => {
            store
                .tg
                .answer_callback(&cb.callback_id, &messages::joined(&cb.from_username))
                .await?;
            store.metrics.active_players.inc();
            fsm.update_current_state(None).await
        }
        Err(BotError::AlreadyRegistered) => {
            tracing::warn!(
                chat_id = cb.chat_id,
                from_username = %cb.from_username,
                "participant already registered",
            );
            store
                .tg
                .answer_callback(&cb.callback_id, &messages::already_registered(&cb.from_username))
                .await
        }
        Err(e) => Err(e),
    }
}

async fn leave_game(store: &Store, cb: &CallbackQuery) -> Result<(), BotError> {
    log_callback("leave_game", cb);
    let Some(fsm) = require_player_turn(store, cb).await? else {
        return Ok(());
    };
    store
        .tg
        .answer_callback(&cb.callback_id, messages::LEFT_CONFIRM)
        .await?;
    store
        .tg
        .send_message(cb.chat_id, &messages::left_game(&cb.from_username))
        .await?;
    if let Some(player) = Participant::find_active(&store.db, fsm.game_id).await? {
        Participant::set_state(&store.db, player.id, ParticipantState::Left).await?;
    }
    fsm.set_current_state(GameState::CheckWinner).await
}

async fn say_letter(store: &Store, cb: &CallbackQuery) -> Result<(), BotError> {
    log_callback("say_letter", cb);
    let Some(fsm) = require_player_turn(store, cb).await? else {
        return Ok(());
    };
    store
        .tg
        .answer_callback(&cb.callback_id, messages::ENTER_LETTER)
        .await?;
    fsm.set_current_state(GameState::WaitingForLetter).await
}

async fn say_word(store: &Store, cb: &CallbackQuery) -> Result<(), BotError> {
    log_callback("say_word", cb);
    let Some(fsm) = require_player_turn(store, cb).await? else {
        return Ok(());
    };
    store
        .tg
        .answer_callback(&cb.callback_id, messages::ENTER_WORD)
        .await?;
    fsm.set_current_state(GameState::WaitingForWord).await
}

async fn text_message(store: &Store, msg: &Message) -> Result<(), BotError> {
    tracing::info!(
        handler = "text_message",
        from_username = %msg.from_username,
        chat_id = msg.chat_id,
        "message received",
    );
    let Some(fsm) = store.registry.get(msg.chat_id).await else {
        return store
            .tg
            .send_keyboard(msg.chat_id, messages::START_PROMPT, client::start_keyboard())
            .await;
    };
    match fsm.current_state().await {
        Some(GameState::WaitingForLetter | GameState::WaitingForWord) => {
            fsm.update_current_state(Some(&msg.text)).await
        }
        _ => Ok(()),
    }
}

/// Shared guard for the in-turn buttons: a game must be running, in
/// `PLAYER_TURN`, and the press must come from the active player. A `None`
/// return means the guard already answered the callback.
async fn require_player_turn(
    store: &Store,
    cb: &CallbackQuery,
) -> Result<Option<Arc<Fsm>>, BotError> {
    let Some(fsm) = store.registry.get(cb.chat_id).await else {
        store
            .tg
            .answer_callback(&cb.callback_id, messages::NO_ACTIVE_GAME)
            .await?;
        return Ok(None);
    };
    if fsm.current_state().await != Some(GameState::PlayerTurn) {
        store
            .tg
            .answer_callback(&cb.callback_id, messages::WRONG_STAGE)
            .await?;
        return Ok(None);
    }
    if fsm.current_player_tg_id().await != Some(cb.from_id) {
        store
            .tg
            .answer_callback(&cb.callback_id, messages::NOT_YOUR_TURN)
            .await?;
        return Ok(None);
    }
    Ok(Some(fsm))
}
