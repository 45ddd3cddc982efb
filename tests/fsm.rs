//! Game flow tests: the real handlers and FSM against an ephemeral
//! Postgres, with a stub chat-API server capturing everything the bot says.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::Mutex;

use wordwheel::config::Config;
use wordwheel::handlers;
use wordwheel::metrics::Metrics;
use wordwheel::models::game::{Game, GameState};
use wordwheel::models::participant::{Participant, ParticipantState};
use wordwheel::models::question::Question;
use wordwheel::services::registry::FsmRegistry;
use wordwheel::telegram::client::TgClient;
use wordwheel::telegram::types::{CallbackQuery, Message, Update, UpdateBody};
use wordwheel::{Store, db};

const CHAT_ID: i64 = 100;
const ALICE: i64 = 1;
const BOB: i64 = 2;

#[derive(Debug, Clone)]
struct ApiCall {
    method: String,
    body: Value,
}

type Calls = Arc<Mutex<Vec<ApiCall>>>;

async fn record_call(
    Path(path): Path<String>,
    State(calls): State<Calls>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let method = path.rsplit('/').next().unwrap_or_default().to_string();
    calls.lock().await.push(ApiCall { method, body });
    Json(json!({"ok": true, "result": {}}))
}

struct TestApp {
    store: Store,
    calls: Calls,
    // Keep the container alive for the lifetime of the test
    _container: testcontainers::ContainerAsync<Postgres>,
}

impl TestApp {
    async fn start() -> Self {
        let container = Postgres::default().start().await.unwrap();
        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(5432).await.unwrap();
        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let pool = PgPool::connect(&url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        // Stub chat API: record every call, answer ok.
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/{*path}", post(record_call))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // A one-sector wheel makes scoring deterministic.
        let config = Config::from_yaml(
            r#"
admin: {email: a@b.c, password: p}
bot: {token: "42:test"}
aiohttp_session: {key: k}
game:
  min_number_of_participants: 2
  wheel_sectors: [100]
  sector_weights: [1]
metrics: {port: 0}
"#,
        )
        .unwrap();

        let store = Store {
            db: pool,
            tg: TgClient::with_base_url(&format!("http://{addr}"), "42:test"),
            config: Arc::new(config),
            registry: FsmRegistry::new(),
            metrics: Metrics::new().unwrap(),
        };
        TestApp {
            store,
            calls,
            _container: container,
        }
    }

    async fn seed_question(&self, question: &str, answer: &str) {
        Question::create(&self.store.db, question, answer).await.unwrap();
    }

    async fn press(&self, from_id: i64, username: &str, command: &str) {
        let update = Update {
            update_id: 1,
            date: 1_700_000_000,
            body: UpdateBody::CallbackQuery(CallbackQuery {
                callback_id: format!("cb-{from_id}-{command}"),
                chat_id: CHAT_ID,
                command: command.to_string(),
                message_id: 1,
                from_id,
                from_username: username.to_string(),
            }),
        };
        handlers::dispatch(&self.store, &update).await.unwrap();
    }

    async fn say(&self, from_id: i64, username: &str, text: &str) {
        let update = Update {
            update_id: 2,
            date: 1_700_000_000,
            body: UpdateBody::Message(Message {
                chat_id: CHAT_ID,
                text: text.to_string(),
                message_id: 2,
                from_id,
                from_username: username.to_string(),
            }),
        };
        handlers::dispatch(&self.store, &update).await.unwrap();
    }

    /// Start a game and join alice and bob; returns the active player's
    /// tg id (first player is random) and the other one's.
    async fn start_two_player_game(&self) -> (i64, i64) {
        self.seed_question("Столица Франции", "Париж").await;
        self.press(ALICE, "alice", "/start").await;
        self.press(ALICE, "alice", "/join").await;
        self.press(BOB, "bob", "/join").await;

        let game = self.running_game().await;
        assert_eq!(game.state, GameState::PlayerTurn);
        let active = Participant::find_active(&self.store.db, game.id)
            .await
            .unwrap()
            .unwrap();
        let other = if active.tg_user_id == ALICE { BOB } else { ALICE };
        (active.tg_user_id, other)
    }

    async fn running_game(&self) -> Game {
        Game::find_running(&self.store.db, CHAT_ID).await.unwrap().unwrap()
    }

    async fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.method == "sendMessage")
            .filter_map(|c| c.body.get("text").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    async fn callback_answers(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.method == "answerCallbackQuery")
            .filter_map(|c| c.body.get("text").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    fn username(&self, tg_id: i64) -> &'static str {
        if tg_id == ALICE { "alice" } else { "bob" }
    }
}

#[tokio::test]
async fn start_creates_a_game_and_asks_for_players() {
    let app = TestApp::start().await;
    app.seed_question("Столица Франции", "Париж").await;

    app.press(ALICE, "alice", "/start").await;

    let game = app.running_game().await;
    assert_eq!(game.state, GameState::WaitingForPlayers);
    assert!(app.store.registry.get(CHAT_ID).await.is_some());
    assert_eq!(app.store.metrics.active_games.get(), 1);

    // The join button went out with the lobby announcement.
    let calls = app.calls.lock().await;
    assert!(calls.iter().any(|c| {
        c.method == "sendMessage" && c.body.get("reply_markup").is_some()
    }));
}

#[tokio::test]
async fn start_without_questions_refuses_politely() {
    let app = TestApp::start().await;

    app.press(ALICE, "alice", "/start").await;

    assert!(app.store.registry.get(CHAT_ID).await.is_none());
    assert!(Game::find_running(&app.store.db, CHAT_ID).await.unwrap().is_none());
    let answers = app.callback_answers().await;
    assert!(answers.iter().any(|t| t.contains("нет вопросов")));
}

#[tokio::test]
async fn start_twice_reports_a_running_game() {
    let app = TestApp::start().await;
    app.seed_question("Столица Франции", "Париж").await;

    app.press(ALICE, "alice", "/start").await;
    app.press(BOB, "bob", "/start").await;

    let answers = app.callback_answers().await;
    assert!(answers.iter().any(|t| t == "Игра уже запущена"));
}

#[tokio::test]
async fn joining_twice_is_rejected() {
    let app = TestApp::start().await;
    app.seed_question("Столица Франции", "Париж").await;

    app.press(ALICE, "alice", "/start").await;
    app.press(ALICE, "alice", "/join").await;
    app.press(ALICE, "alice", "/join").await;

    let answers = app.callback_answers().await;
    assert!(answers.iter().any(|t| t.contains("уже зарегистрированы")));
    let game = app.running_game().await;
    assert_eq!(
        Participant::count_by_game(&app.store.db, game.id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn game_starts_once_enough_players_joined() {
    let app = TestApp::start().await;
    let (active, _) = app.start_two_player_game().await;

    // The turn announcement names the active player and the masked word.
    let texts = app.sent_texts().await;
    let announcement = texts
        .iter()
        .find(|t| t.contains("На барабане"))
        .expect("turn announcement");
    assert!(announcement.contains(app.username(active)));
    assert!(announcement.contains("_ _ _ _ _"));
    assert!(announcement.contains("100"));
}

#[tokio::test]
async fn guessing_every_letter_wins_the_game() {
    let app = TestApp::start().await;
    let (active, _) = app.start_two_player_game().await;
    let username = app.username(active);
    let game = app.running_game().await;

    for letter in ["П", "А", "Р", "И", "Ж"] {
        app.press(active, username, "/say_letter").await;
        app.say(active, username, letter).await;
    }

    // Five hits at 100 apiece; the winner is recorded and the FSM is gone.
    let players = Participant::find_by_game_with_users(&app.store.db, game.id)
        .await
        .unwrap();
    let winner = players.iter().find(|p| p.tg_user_id == active).unwrap();
    assert_eq!(winner.state, ParticipantState::Winner);
    assert_eq!(winner.points, 500);

    let game = Game::find_by_id(&app.store.db, game.id).await.unwrap();
    assert_eq!(game.state, GameState::GameFinished);
    assert!(app.store.registry.get(CHAT_ID).await.is_none());
    assert_eq!(app.store.metrics.active_games.get(), 0);

    let texts = app.sent_texts().await;
    let scoreboard = texts.iter().find(|t| t.contains("Игра окончена")).unwrap();
    assert!(scoreboard.contains("ПАРИЖ"));
    assert!(scoreboard.contains(&format!("@{username}: 500")));
}

#[tokio::test]
async fn wrong_letter_passes_the_turn() {
    let app = TestApp::start().await;
    let (active, other) = app.start_two_player_game().await;
    let game = app.running_game().await;

    app.press(active, app.username(active), "/say_letter").await;
    app.say(active, app.username(active), "Ю").await;

    // The miss is recorded and the other player takes over.
    let game = Game::find_by_id(&app.store.db, game.id).await.unwrap();
    assert_eq!(game.revealed_letters, "Ю");
    assert_eq!(game.state, GameState::PlayerTurn);
    let now_active = Participant::find_active(&app.store.db, game.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(now_active.tg_user_id, other);

    let texts = app.sent_texts().await;
    assert!(texts.iter().any(|t| t == "Такой буквы нет в слове"));
}

#[tokio::test]
async fn non_letter_input_passes_the_turn() {
    let app = TestApp::start().await;
    let (active, other) = app.start_two_player_game().await;

    app.press(active, app.username(active), "/say_letter").await;
    app.say(active, app.username(active), "57").await;

    let game = app.running_game().await;
    assert_eq!(game.revealed_letters, "");
    let now_active = Participant::find_active(&app.store.db, game.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(now_active.tg_user_id, other);

    let texts = app.sent_texts().await;
    assert!(texts.iter().any(|t| t == "Это не буква!"));
}

#[tokio::test]
async fn wrong_word_eliminates_and_the_last_player_wins() {
    let app = TestApp::start().await;
    let (active, other) = app.start_two_player_game().await;
    let game = app.running_game().await;

    app.press(active, app.username(active), "/say_word").await;
    app.say(active, app.username(active), "Москва").await;

    let players = Participant::find_by_game_with_users(&app.store.db, game.id)
        .await
        .unwrap();
    let guesser = players.iter().find(|p| p.tg_user_id == active).unwrap();
    let survivor = players.iter().find(|p| p.tg_user_id == other).unwrap();
    assert_eq!(guesser.state, ParticipantState::Loser);
    assert_eq!(survivor.state, ParticipantState::Winner);

    let game = Game::find_by_id(&app.store.db, game.id).await.unwrap();
    assert_eq!(game.state, GameState::GameFinished);
    assert!(app.store.registry.get(CHAT_ID).await.is_none());
}

#[tokio::test]
async fn right_word_wins_with_the_bonus() {
    let app = TestApp::start().await;
    let (active, _) = app.start_two_player_game().await;
    let game = app.running_game().await;

    app.press(active, app.username(active), "/say_word").await;
    app.say(active, app.username(active), " париж ").await;

    let players = Participant::find_by_game_with_users(&app.store.db, game.id)
        .await
        .unwrap();
    let winner = players.iter().find(|p| p.tg_user_id == active).unwrap();
    assert_eq!(winner.state, ParticipantState::Winner);
    assert_eq!(winner.points, 100);
}

#[tokio::test]
async fn leaving_mid_turn_hands_victory_to_the_survivor() {
    let app = TestApp::start().await;
    let (active, other) = app.start_two_player_game().await;
    let game = app.running_game().await;

    app.press(active, app.username(active), "/leave_game").await;

    let players = Participant::find_by_game_with_users(&app.store.db, game.id)
        .await
        .unwrap();
    let leaver = players.iter().find(|p| p.tg_user_id == active).unwrap();
    let survivor = players.iter().find(|p| p.tg_user_id == other).unwrap();
    assert_eq!(leaver.state, ParticipantState::Left);
    assert_eq!(survivor.state, ParticipantState::Winner);

    let texts = app.sent_texts().await;
    assert!(texts.iter().any(|t| t.contains("Покинул игру")));
}

#[tokio::test]
async fn only_the_active_player_may_act() {
    let app = TestApp::start().await;
    let (_, other) = app.start_two_player_game().await;

    app.press(other, app.username(other), "/say_letter").await;

    let answers = app.callback_answers().await;
    assert!(answers.iter().any(|t| t == "Дождитесь своего хода"));
    assert_eq!(app.running_game().await.state, GameState::PlayerTurn);
}

#[tokio::test]
async fn buttons_outside_a_game_get_a_guard_reply() {
    let app = TestApp::start().await;

    app.press(ALICE, "alice", "/join").await;

    let answers = app.callback_answers().await;
    assert!(answers.iter().any(|t| t == "Нет активной игры"));
}

#[tokio::test]
async fn stray_text_offers_the_start_button() {
    let app = TestApp::start().await;

    app.say(ALICE, "alice", "привет").await;

    let calls = app.calls.lock().await;
    let start_offer = calls
        .iter()
        .find(|c| c.method == "sendMessage")
        .expect("start button message");
    assert!(start_offer.body.get("reply_markup").is_some());
}

#[tokio::test]
async fn unknown_commands_are_acked_and_ignored() {
    let app = TestApp::start().await;

    app.press(ALICE, "alice", "/dance").await;

    assert_eq!(app.callback_answers().await.len(), 1);
    assert!(app.sent_texts().await.is_empty());
}

#[tokio::test]
async fn restart_restores_the_lobby_from_storage() {
    let app = TestApp::start().await;
    app.seed_question("Столица Франции", "Париж").await;
    app.press(ALICE, "alice", "/start").await;
    app.press(ALICE, "alice", "/join").await;
    let game = app.running_game().await;

    // Simulate a worker restart: process memory is gone, the game row stays.
    app.store.registry.remove(CHAT_ID).await;
    app.calls.lock().await.clear();

    app.press(BOB, "bob", "/start").await;

    let restored = app.store.registry.get(CHAT_ID).await.expect("restored fsm");
    assert_eq!(restored.game_id, game.id);
    assert_eq!(restored.current_state().await, Some(GameState::WaitingForPlayers));

    let answers = app.callback_answers().await;
    assert!(answers.iter().any(|t| t == "Игра восстановлена"));

    // The join button is re-sent, and joining still works.
    {
        let calls = app.calls.lock().await;
        assert!(calls.iter().any(|c| {
            c.method == "sendMessage" && c.body.get("reply_markup").is_some()
        }));
    }
    app.press(BOB, "bob", "/join").await;
    assert_eq!(app.running_game().await.state, GameState::PlayerTurn);
}

#[tokio::test]
async fn restored_player_turn_reannounces_and_keeps_the_player() {
    let app = TestApp::start().await;
    let (active, _) = app.start_two_player_game().await;
    let game = app.running_game().await;

    app.store.registry.remove(CHAT_ID).await;
    app.calls.lock().await.clear();

    app.press(BOB, "bob", "/start").await;

    let restored = app.store.registry.get(CHAT_ID).await.expect("restored fsm");
    assert_eq!(restored.current_state().await, Some(GameState::PlayerTurn));
    assert_eq!(restored.current_player_tg_id().await, Some(active));
    assert_eq!(game.id, restored.game_id);

    let texts = app.sent_texts().await;
    assert!(texts.iter().any(|t| t.contains("На барабане")));
}
