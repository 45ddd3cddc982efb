//! Every chat-visible string, in one place. All of them are short,
//! self-contained Russian; nothing internal ever leaks here.

use crate::models::participant::ParticipantWithUser;

pub const GAME_ALREADY_RUNNING: &str = "Игра уже запущена";
pub const GAME_RESTORED: &str = "Игра восстановлена";
pub const GAME_STARTED: &str = "Старт игры";
pub const NO_ACTIVE_GAME: &str = "Нет активной игры";
pub const WRONG_STAGE: &str = "Игра на другом этапе";
pub const NOT_YOUR_TURN: &str = "Дождитесь своего хода";
pub const NO_QUESTIONS: &str = "Не удалось начать игру: нет вопросов";
pub const LEFT_CONFIRM: &str = "Вы покинули игру";
pub const ENTER_LETTER: &str = "Введи одну букву";
pub const ENTER_WORD: &str = "Введи слово";
pub const PLAYER_TIMEOUT: &str = "Вы не успели, переход хода";
pub const NOT_A_LETTER: &str = "Это не буква!";
pub const LETTER_ALREADY_NAMED: &str = "Такую букву уже называли!";
pub const LETTER_MISS: &str = "Такой буквы нет в слове";
pub const START_PROMPT: &str = "Сыграем в Поле чудес?";
pub const JOIN_PROMPT: &str =
    "Начинается набор игроков!\nНажмите кнопку, чтобы присоединиться";

pub fn joined(username: &str) -> String {
    format!("Игрок @{username} присоединился к игре")
}

pub fn already_registered(username: &str) -> String {
    format!("{username} - вы уже зарегистрированы")
}

pub fn players_connected(count: i64, min_players: i64) -> String {
    format!("Подключились ({count}/{min_players}) игроков")
}

pub fn not_enough_players(count: i64, min_players: i64) -> String {
    format!("Недостаточно игроков ({count}/{min_players}).\nИгра завершена.")
}

pub fn turn_announcement(username: &str, masked_word: &str, bonus: i64) -> String {
    format!("Ход игрока @{username}!\nСлово: {masked_word}\nНа барабане: {bonus}")
}

pub fn prompt_letter(username: &str) -> String {
    format!("@{username}, назовите букву")
}

pub fn prompt_word(username: &str) -> String {
    format!("@{username}, назовите слово целиком")
}

pub fn letter_hit(points: i64) -> String {
    format!("Верно! +{points} очков")
}

pub fn word_guessed(username: &str) -> String {
    format!("Верно! @{username} угадал слово!")
}

pub fn wrong_word(username: &str) -> String {
    format!("Увы, @{username}, это не то слово. Вы выбываете из игры")
}

pub fn left_game(username: &str) -> String {
    format!("@{username} Покинул игру")
}

/// Final scoreboard: winner line, then the rest by points descending.
pub fn scoreboard(
    answer: &str,
    winner: &ParticipantWithUser,
    losers: &[&ParticipantWithUser],
) -> String {
    let mut text = format!(
        "Игра окончена!\nСлово: {}\nПобедитель: @{}: {} очков",
        answer.to_uppercase(),
        winner.username,
        winner.points,
    );
    if !losers.is_empty() {
        text.push_str("\nОстальные игроки:");
        for loser in losers {
            text.push_str(&format!("\n@{}: {} очков", loser.username, loser.points));
        }
    }
    text
}
