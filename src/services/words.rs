//! The word-guessing rules as pure functions over the answer and the
//! accumulated revealed letters. Everything here is I/O-free; the FSM
//! states translate outcomes into messages and transitions.

use std::collections::HashSet;

use crate::models::participant::{ParticipantState, ParticipantWithUser};

/// Render the answer with unrevealed positions masked, one space between
/// characters: `"П _ Р _ Ж"`.
pub fn mask_word(answer: &str, revealed: &str) -> String {
    let revealed: HashSet<char> = revealed.chars().collect();
    answer
        .to_uppercase()
        .chars()
        .map(|c| {
            if revealed.contains(&c) {
                c.to_string()
            } else {
                "_".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True once every alphabetic character of the answer has been revealed.
pub fn is_word_guessed(answer: &str, revealed: &str) -> bool {
    let revealed: HashSet<char> = revealed.chars().collect();
    answer
        .to_uppercase()
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(|c| revealed.contains(&c))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LetterOutcome {
    /// Not a single alphabetic character.
    NotALetter,
    /// Already tried this game.
    AlreadyNamed,
    /// Valid letter, absent from the answer.
    Miss { letter: char },
    /// Present in the answer `occurrences` times; `guessed` when this
    /// letter completes the word.
    Hit {
        letter: char,
        occurrences: usize,
        guessed: bool,
    },
}

/// Classify one letter guess against the answer and the letters already
/// revealed (both uppercase by construction).
pub fn evaluate_letter(answer: &str, revealed: &str, input: &str) -> LetterOutcome {
    let uppercased = input.trim().to_uppercase();
    let mut chars = uppercased.chars();
    let (Some(letter), None) = (chars.next(), chars.next()) else {
        return LetterOutcome::NotALetter;
    };
    if !letter.is_alphabetic() {
        return LetterOutcome::NotALetter;
    }
    if revealed.chars().any(|c| c == letter) {
        return LetterOutcome::AlreadyNamed;
    }

    let answer = answer.to_uppercase();
    let occurrences = answer.chars().filter(|c| *c == letter).count();
    if occurrences == 0 {
        return LetterOutcome::Miss { letter };
    }

    let mut now_revealed = revealed.to_string();
    now_revealed.push(letter);
    LetterOutcome::Hit {
        letter,
        occurrences,
        guessed: is_word_guessed(&answer, &now_revealed),
    }
}

/// Whole-word guess: trimmed, case-insensitive equality.
pub fn is_word_match(answer: &str, guess: &str) -> bool {
    guess.trim().to_uppercase() == answer.trim().to_uppercase()
}

/// Indices of participants still waiting for a turn.
pub fn waiting_indices(players: &[ParticipantWithUser]) -> Vec<usize> {
    players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.state == ParticipantState::Waiting)
        .map(|(i, _)| i)
        .collect()
}

/// Round-robin successor: scan from the slot after `current`, wrapping,
/// until a `WAITING` participant is found. `players` must be sorted by
/// `turn_order`. Participants who left or lost are skipped, so every
/// waiting player gets a turn before anyone repeats.
pub fn next_waiting_after(players: &[ParticipantWithUser], current: usize) -> Option<usize> {
    if players.is_empty() {
        return None;
    }
    let len = players.len();
    (1..=len)
        .map(|step| (current + step) % len)
        .find(|&i| players[i].state == ParticipantState::Waiting)
}
