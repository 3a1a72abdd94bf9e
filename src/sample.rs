//! Starter deck created on first launch
use crate::database::db;
use crate::models::{Flashcard, LearnerId};
use rusqlite::{Connection, Result};

pub const SAMPLE_DECK: &str = "Portuguese Basics";

pub fn sample_flashcards() -> Vec<Flashcard> {
    vec![
        Flashcard::new("olá", "hello"),
        Flashcard::new("obrigado / obrigada", "thank you"),
        Flashcard::new("por favor", "please"),
        Flashcard::new("desculpe", "sorry / excuse me"),
        Flashcard::new("bom dia", "good morning"),
        Flashcard::new("boa noite", "good night"),
        Flashcard::new("saudade", "longing, missing someone"),
        Flashcard::new("a água", "water"),
    ]
}

/// Creates the starter deck when the learner has no decks at all.
/// Returns whether anything was created.
pub fn seed_if_empty(learner_id: LearnerId, conn: &Connection) -> Result<bool> {
    if !db::get_all_decks(learner_id, conn)?.is_empty() {
        return Ok(false);
    }

    db::new_deck(SAMPLE_DECK, learner_id, conn)?;
    for card in sample_flashcards() {
        db::add_flashcard(SAMPLE_DECK, learner_id, &card.term, &card.definition, conn)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_seed_only_once() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn, Utc::now()).unwrap();

        assert!(seed_if_empty(1, &conn).unwrap());
        assert!(!seed_if_empty(1, &conn).unwrap());

        let cards = db::get_flashcards_for_deck(SAMPLE_DECK, 1, &conn).unwrap();
        assert_eq!(cards.len(), sample_flashcards().len());
    }

    #[test]
    fn test_each_learner_gets_own_starter_deck() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn, Utc::now()).unwrap();

        assert!(seed_if_empty(1, &conn).unwrap());
        assert!(seed_if_empty(2, &conn).unwrap());

        let expected = sample_flashcards().len();
        assert_eq!(db::list_cards_for_learner(1, &conn).unwrap().len(), expected);
        assert_eq!(db::list_cards_for_learner(2, &conn).unwrap().len(), expected);
    }
}
