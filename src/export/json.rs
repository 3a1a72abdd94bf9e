//! JSON import/export of decks.
//! Only the term/definition pairs travel; review progress stays in the database.

use crate::database::db;
use crate::error::{AppError, Result};
use crate::models::{Deck, DeckSet, LearnerId};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Exports a deck to a JSON file at the specified path.
pub fn export_json_to_path(deck: &Deck, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(deck)?;
    fs::write(path, json_string)?;
    log::info!("Deck '{}' exported to {}", deck.name, path.display());
    Ok(())
}

/// Reads a deck from a JSON file.
/// Fails if the file is missing, is not valid JSON or holds a blank card.
pub fn import_json(path: &Path) -> Result<Deck> {
    let contents = fs::read_to_string(path)?;
    let deck: Deck = serde_json::from_str(&contents)?;

    if let Some(card) = deck.flashcards.iter().find(|card| !card.is_valid()) {
        return Err(AppError::Config(format!(
            "deck '{}' contains a card with an empty side: '{}'",
            deck.name, card.term
        )));
    }

    log::info!("Deck '{}' read from {}", deck.name, path.display());
    Ok(deck)
}

/// Stores an imported deck for a learner in one transaction.
///
/// Refuses decks whose name is already taken.
pub fn save_imported_deck(
    deck: &Deck,
    learner_id: LearnerId,
    existing: &DeckSet,
    conn: &Connection,
) -> Result<()> {
    if existing.contains(&deck.name) {
        return Err(AppError::Config(format!(
            "Deck '{}' already exists! Please rename it in the JSON file.",
            deck.name
        )));
    }

    let tx = conn.unchecked_transaction()?;
    db::new_deck(&deck.name, learner_id, &tx)?;
    for flashcard in &deck.flashcards {
        db::add_flashcard(
            &deck.name,
            learner_id,
            &flashcard.term,
            &flashcard.definition,
            &tx,
        )?;
    }
    tx.commit()?;
    Ok(())
}
