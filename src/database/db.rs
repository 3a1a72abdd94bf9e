//! Database operations for the flashcard application
//!
//! Handles SQLite schema setup, CRUD operations for decks and flashcards,
//! SM-2 review data, the append-only review log and the simulated current date.

use crate::models::{
    Card, CardId, CardSchedulingState, Deck, DeckSet, Flashcard, LearnerId, ReviewLogEntry,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use std::path::Path;

/// Opens (or creates) the database file and makes sure the schema exists
pub fn init_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn, Utc::now())?;
    log::info!("Opened database at {}", path.display());
    Ok(conn)
}

/// Creates tables for decks, flashcards, SM-2 review data, the review log and app state.
///
/// Sets the current date to `now` if it was never initialized.
pub fn init_schema(conn: &Connection, now: DateTime<Utc>) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS decks (
            learner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (learner_id, name)
        );
        CREATE TABLE IF NOT EXISTS flashcards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deck_name TEXT NOT NULL,
            learner_id INTEGER NOT NULL,
            term TEXT NOT NULL,
            definition TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (learner_id, deck_name) REFERENCES decks(learner_id, name),
            UNIQUE(learner_id, deck_name, term)
        );
        CREATE TABLE IF NOT EXISTS review_data (
            flashcard_id INTEGER PRIMARY KEY,
            easiness_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            next_review_date INTEGER NOT NULL,
            FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS review_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            flashcard_id INTEGER NOT NULL,
            learner_id INTEGER NOT NULL,
            quality INTEGER NOT NULL,
            ease_before REAL NOT NULL,
            ease_after REAL NOT NULL,
            interval_before INTEGER NOT NULL,
            interval_after INTEGER NOT NULL,
            reviewed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS review_log_learner ON review_log (learner_id, reviewed_at);
        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![now.timestamp().to_string()],
    )?;

    Ok(())
}

fn from_timestamp(secs: i64, column: usize) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, secs))
}

/// Retrieves the simulated current date
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let timestamp: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    let secs = timestamp
        .parse::<i64>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))?;
    from_timestamp(secs, 0)
}

/// Advances the simulated date by one day (to try out spaced repetition without waiting)
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + Duration::days(1);

    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
        params![next_day.timestamp().to_string()],
    )?;

    log::debug!("Simulated date advanced to {}", next_day);
    Ok(next_day)
}

/// Creates a new deck owned by `learner_id`. Deck names are unique per learner.
pub fn new_deck(name: &str, learner_id: LearnerId, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO decks (name, learner_id) VALUES (?1, ?2)",
        params![name, learner_id],
    )?;
    log::info!("Deck '{}' created", name);
    Ok(())
}

/// Adds a flashcard to a learner's deck and initializes its SM-2 review data
///
/// Returns the flashcard ID. If the flashcard already exists (same deck + term),
/// the existing ID is returned and its review data is left alone.
/// Fails with `QueryReturnedNoRows` if the learner has no such deck.
pub fn add_flashcard(
    deck_name: &str,
    learner_id: LearnerId,
    term: &str,
    definition: &str,
    conn: &Connection,
) -> Result<CardId> {
    conn.query_row(
        "SELECT 1 FROM decks WHERE learner_id = ?1 AND name = ?2",
        params![learner_id, deck_name],
        |_| Ok(()),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO flashcards (deck_name, learner_id, term, definition)
         VALUES (?1, ?2, ?3, ?4)",
        params![deck_name, learner_id, term, definition],
    )?;

    let flashcard_id: CardId = conn.query_row(
        "SELECT id FROM flashcards WHERE learner_id = ?1 AND deck_name = ?2 AND term = ?3",
        params![learner_id, deck_name, term],
        |row| row.get(0),
    )?;

    // New cards are due straight away
    let initial = CardSchedulingState::new(get_current_date(conn)?);
    conn.execute(
        "INSERT OR IGNORE INTO review_data
            (flashcard_id, easiness_factor, interval_days, repetitions, next_review_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            flashcard_id,
            initial.ease_factor,
            initial.interval_days,
            initial.repetitions,
            initial.next_review_at.timestamp()
        ],
    )?;

    Ok(flashcard_id)
}

/// Suspends (`false`) or resumes (`true`) a card
pub fn set_card_active(card_id: CardId, active: bool, conn: &Connection) -> Result<usize> {
    conn.execute(
        "UPDATE flashcards SET active = ?1 WHERE id = ?2",
        params![active, card_id],
    )
}

/// Retrieves all flashcards for one of a learner's decks
///
/// Returns vector of (flashcard_id, Flashcard) tuples
pub fn get_flashcards_for_deck(
    deck_name: &str,
    learner_id: LearnerId,
    conn: &Connection,
) -> Result<Vec<(CardId, Flashcard)>> {
    let mut stmt = conn.prepare(
        "SELECT id, term, definition FROM flashcards
         WHERE learner_id = ?1 AND deck_name = ?2
         ORDER BY id",
    )?;

    let flashcards = stmt
        .query_map(params![learner_id, deck_name], |row| {
            Ok((row.get(0)?, Flashcard::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
        })?
        .collect::<Result<Vec<(CardId, Flashcard)>>>()?;

    Ok(flashcards)
}

const CARD_COLUMNS: &str = "SELECT f.id, f.learner_id, f.deck_name, f.term, f.definition, f.active,
        r.easiness_factor, r.interval_days, r.repetitions, r.next_review_date
     FROM flashcards f
     JOIN review_data r ON f.id = r.flashcard_id";

fn card_from_row(row: &Row<'_>) -> Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        deck_name: row.get(2)?,
        flashcard: Flashcard::new(row.get::<_, String>(3)?, row.get::<_, String>(4)?),
        active: row.get(5)?,
        schedule: CardSchedulingState {
            ease_factor: row.get(6)?,
            interval_days: row.get(7)?,
            repetitions: row.get(8)?,
            next_review_at: from_timestamp(row.get(9)?, 9)?,
        },
    })
}

/// Every card of a learner, suspended ones included, in creation order
pub fn list_cards_for_learner(learner_id: LearnerId, conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare(&format!("{CARD_COLUMNS} WHERE f.learner_id = ?1 ORDER BY f.id"))?;
    let cards = stmt
        .query_map(params![learner_id], card_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// A single card with its current review data
pub fn load_card(card_id: CardId, conn: &Connection) -> Result<Option<Card>> {
    conn.query_row(
        &format!("{CARD_COLUMNS} WHERE f.id = ?1"),
        params![card_id],
        card_from_row,
    )
    .optional()
}

/// Updates SM-2 review data for a flashcard. Returns the number of rows changed.
pub fn update_review_data(
    card_id: CardId,
    state: &CardSchedulingState,
    conn: &Connection,
) -> Result<usize> {
    conn.execute(
        "UPDATE review_data
         SET easiness_factor = ?1, interval_days = ?2, repetitions = ?3, next_review_date = ?4
         WHERE flashcard_id = ?5",
        params![
            state.ease_factor,
            state.interval_days,
            state.repetitions,
            state.next_review_at.timestamp(),
            card_id
        ],
    )
}

/// Appends an entry to the review log
pub fn insert_review_log(entry: &ReviewLogEntry, conn: &Connection) -> Result<i64> {
    conn.execute(
        "INSERT INTO review_log (flashcard_id, learner_id, quality, ease_before, ease_after,
                                 interval_before, interval_after, reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.card_id,
            entry.learner_id,
            entry.quality,
            entry.ease_before,
            entry.ease_after,
            entry.interval_before,
            entry.interval_after,
            entry.reviewed_at.timestamp()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A learner's review history, oldest first
pub fn review_history(learner_id: LearnerId, conn: &Connection) -> Result<Vec<ReviewLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT flashcard_id, learner_id, quality, ease_before, ease_after,
                interval_before, interval_after, reviewed_at
         FROM review_log
         WHERE learner_id = ?1
         ORDER BY reviewed_at ASC, id ASC",
    )?;

    let entries = stmt
        .query_map(params![learner_id], |row| {
            Ok(ReviewLogEntry {
                card_id: row.get(0)?,
                learner_id: row.get(1)?,
                quality: row.get(2)?,
                ease_before: row.get(3)?,
                ease_after: row.get(4)?,
                interval_before: row.get(5)?,
                interval_after: row.get(6)?,
                reviewed_at: from_timestamp(row.get(7)?, 7)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(entries)
}

/// Counts active flashcards of a learner's deck that are due at `now`
pub fn count_due_cards(
    deck_name: &str,
    learner_id: LearnerId,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM flashcards f
         JOIN review_data r ON f.id = r.flashcard_id
         WHERE f.learner_id = ?1 AND f.deck_name = ?2 AND f.active = 1
           AND r.next_review_date <= ?3",
        params![learner_id, deck_name, now.timestamp()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Retrieves the names of a learner's decks
pub fn get_all_decks(learner_id: LearnerId, conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM decks WHERE learner_id = ?1 ORDER BY name")?;
    let decks = stmt
        .query_map(params![learner_id], |row| row.get(0))?
        .collect::<Result<Vec<String>>>()?;
    Ok(decks)
}

/// Loads all decks of a learner with their flashcards into memory
///
/// Does not load SM-2 review data - that's fetched when a review session starts.
pub fn load_all_decks(learner_id: LearnerId, conn: &Connection) -> Result<DeckSet> {
    let mut decks = Vec::new();

    for deck_name in get_all_decks(learner_id, conn)? {
        let flashcards = get_flashcards_for_deck(&deck_name, learner_id, conn)?
            .into_iter()
            .map(|(_, fc)| fc)
            .collect();

        decks.push(Deck {
            name: deck_name,
            flashcards,
        });
    }

    Ok(DeckSet { decks })
}
