use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use crate::Store;
use crate::error::BotError;
use crate::models::game::{Game, GameState, GameWithContext};
use crate::models::participant::Participant;
use crate::services::messages;
use crate::services::states;
use crate::services::timer::TimerManager;

/// Per-chat game state machine. All mutation happens under one async mutex,
/// which serializes the owning worker's handler calls against late-firing
/// timer callbacks; across chats there is no shared state at all.
pub struct Fsm {
    pub(crate) store: Store,
    pub chat_id: i64,
    pub game_id: i64,
    pub(crate) weak: Weak<Fsm>,
    inner: Mutex<FsmInner>,
}

#[derive(Default)]
pub(crate) struct FsmInner {
    pub current: Option<GameState>,
    pub current_player_tg_id: Option<i64>,
    pub current_player_username: Option<String>,
    pub bonus_points: i64,
    pub timer: TimerManager,
}

impl Fsm {
    pub fn new(store: Store, chat_id: i64, game_id: i64) -> Arc<Fsm> {
        Arc::new_cyclic(|weak| Fsm {
            store,
            chat_id,
            game_id,
            weak: weak.clone(),
            inner: Mutex::new(FsmInner::default()),
        })
    }

    pub async fn current_state(&self) -> Option<GameState> {
        self.inner.lock().await.current
    }

    pub async fn current_player_tg_id(&self) -> Option<i64> {
        self.inner.lock().await.current_player_tg_id
    }

    /// Transition to `target`, then keep following the states' own
    /// transitions until one settles. Re-entering the current state is a
    /// no-op with no observable side effects.
    pub async fn set_current_state(&self, target: GameState) -> Result<(), BotError> {
        let mut inner = self.inner.lock().await;
        self.transition(&mut inner, target).await
    }

    /// Feed the current state an external event: a join in
    /// `WAITING_FOR_PLAYERS`, or the guess text in `WAITING_FOR_LETTER` /
    /// `WAITING_FOR_WORD`. Any other state ignores it.
    pub async fn update_current_state(&self, text: Option<&str>) -> Result<(), BotError> {
        let mut inner = self.inner.lock().await;
        let next = match inner.current {
            Some(GameState::WaitingForPlayers) => {
                states::update_waiting_for_players(self, &mut inner).await?
            }
            Some(GameState::WaitingForLetter) => match text {
                Some(text) => states::update_waiting_for_letter(self, &mut inner, text).await?,
                None => None,
            },
            Some(GameState::WaitingForWord) => match text {
                Some(text) => states::update_waiting_for_word(self, &mut inner, text).await?,
                None => None,
            },
            _ => None,
        };
        if let Some(next) = next {
            self.transition(&mut inner, next).await?;
        }
        Ok(())
    }

    /// Rehydrate from a persisted game after a restart, then re-run the
    /// state's entry action so timers restart and the chat is re-prompted.
    pub async fn restore_current_state(&self, context: &GameWithContext) -> Result<(), BotError> {
        let mut inner = self.inner.lock().await;
        inner.current = Some(context.game.state);
        inner.bonus_points = context.game.bonus_points;
        if let Some(player) = &context.current_player {
            inner.current_player_tg_id = Some(player.tg_user_id);
            inner.current_player_username = Some(player.username.clone());
        }
        if let Some(next) = states::enter(self, &mut inner, context.game.state).await? {
            self.transition(&mut inner, next).await?;
        }
        Ok(())
    }

    async fn transition(
        &self,
        inner: &mut FsmInner,
        mut target: GameState,
    ) -> Result<(), BotError> {
        loop {
            if inner.current == Some(target) {
                return Ok(());
            }
            inner.timer.cancel();
            Game::update_state(&self.store.db, self.game_id, target).await?;
            tracing::info!(
                chat_id = self.chat_id,
                game_id = self.game_id,
                state = ?target,
                "state entered",
            );
            inner.current = Some(target);
            match states::enter(self, inner, target).await? {
                Some(next) => target = next,
                None => return Ok(()),
            }
        }
    }

    /// 60-second deadline for the lobby: without enough players the game
    /// is finished, otherwise the join update already moved us on.
    pub(crate) fn handle_join_timeout<'a>(&'a self) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.current != Some(GameState::WaitingForPlayers) {
                return;
            }
            let result = async {
                let count = Participant::count_by_game(&self.store.db, self.game_id).await?;
                let min_players = self.store.config.game.min_number_of_participants;
                if count < min_players {
                    self.store
                        .tg
                        .send_message(self.chat_id, &messages::not_enough_players(count, min_players))
                        .await?;
                    self.transition(&mut inner, GameState::GameFinished).await?;
                }
                Ok::<_, BotError>(())
            }
            .await;
            if let Err(e) = result {
                tracing::error!(chat_id = self.chat_id, "join timeout failed: {e}");
            }
        })
    }

    /// 30-second deadline for a turn or a pending guess. The state check
    /// makes a late firing after a transition a no-op.
    pub(crate) fn handle_turn_timeout<'a>(
        &'a self,
        expected: GameState,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.current != Some(expected) {
                return;
            }
            let result = async {
                self.store
                    .tg
                    .send_message(self.chat_id, messages::PLAYER_TIMEOUT)
                    .await?;
                self.transition(&mut inner, GameState::NextPlayerTurn).await
            }
            .await;
            if let Err(e) = result {
                tracing::error!(chat_id = self.chat_id, "turn timeout failed: {e}");
            }
        })
    }
}
