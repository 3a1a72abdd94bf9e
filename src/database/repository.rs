//! Card repository used by review sessions.
//!
//! `record_review` must store the new schedule and the log entry together:
//! either both are written or neither is.

use super::db;
use crate::models::{Card, CardId, CardSchedulingState, LearnerId, ReviewLogEntry};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

pub trait CardRepository {
    fn list_cards_for_learner(&self, learner_id: LearnerId) -> Result<Vec<Card>>;

    /// Re-reads a card so grading starts from what is stored, not from a stale copy.
    fn load_card(&self, card_id: CardId) -> Result<Card>;

    fn update_card_schedule(&mut self, card_id: CardId, state: &CardSchedulingState) -> Result<()>;

    fn append_review_log(&mut self, entry: &ReviewLogEntry) -> Result<()>;

    /// Stores a graded review atomically.
    fn record_review(
        &mut self,
        card_id: CardId,
        state: &CardSchedulingState,
        entry: &ReviewLogEntry,
    ) -> Result<()>;
}

/// SQLite backed repository. Also owns the connection used by the rest of the app.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(db::init_database(path)?))
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// The simulated current date used as "now" for scheduling.
    pub fn today(&self) -> Result<DateTime<Utc>> {
        Ok(db::get_current_date(&self.conn)?)
    }
}

impl CardRepository for SqliteRepository {
    fn list_cards_for_learner(&self, learner_id: LearnerId) -> Result<Vec<Card>> {
        Ok(db::list_cards_for_learner(learner_id, &self.conn)?)
    }

    fn load_card(&self, card_id: CardId) -> Result<Card> {
        db::load_card(card_id, &self.conn)?.ok_or(RepositoryError::CardNotFound(card_id))
    }

    fn update_card_schedule(&mut self, card_id: CardId, state: &CardSchedulingState) -> Result<()> {
        match db::update_review_data(card_id, state, &self.conn)? {
            0 => Err(RepositoryError::CardNotFound(card_id)),
            _ => Ok(()),
        }
    }

    fn append_review_log(&mut self, entry: &ReviewLogEntry) -> Result<()> {
        db::insert_review_log(entry, &self.conn)?;
        Ok(())
    }

    fn record_review(
        &mut self,
        card_id: CardId,
        state: &CardSchedulingState,
        entry: &ReviewLogEntry,
    ) -> Result<()> {
        // Dropping the transaction without commit rolls both writes back
        let tx = self.conn.transaction()?;

        if db::update_review_data(card_id, state, &tx)? == 0 {
            return Err(RepositoryError::CardNotFound(card_id));
        }
        db::insert_review_log(entry, &tx)?;

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 7, 0, 0).unwrap()
    }

    fn repository_with_card() -> (SqliteRepository, CardId) {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn, start()).unwrap();
        db::new_deck("Saudações", 1, &conn).unwrap();
        let id = db::add_flashcard("Saudações", 1, "olá", "hello", &conn).unwrap();
        (SqliteRepository::new(conn), id)
    }

    fn reviewed_state() -> CardSchedulingState {
        CardSchedulingState {
            ease_factor: 2.6,
            interval_days: 1,
            repetitions: 1,
            next_review_at: start() + Duration::days(1),
        }
    }

    #[test]
    fn test_record_review_writes_schedule_and_log() {
        let (mut repo, id) = repository_with_card();
        let before = repo.load_card(id).unwrap().schedule;
        let after = reviewed_state();
        let entry = ReviewLogEntry::new(id, 1, 5, &before, &after, start());

        repo.record_review(id, &after, &entry).unwrap();

        assert_eq!(repo.load_card(id).unwrap().schedule, after);
        assert_eq!(db::review_history(1, repo.conn()).unwrap(), vec![entry]);
    }

    #[test]
    fn test_record_review_rolls_back_when_log_append_fails() {
        let (mut repo, id) = repository_with_card();
        let before = repo.load_card(id).unwrap().schedule;
        let after = reviewed_state();
        let entry = ReviewLogEntry::new(id, 1, 5, &before, &after, start());

        repo.conn().execute("DROP TABLE review_log", []).unwrap();

        let result = repo.record_review(id, &after, &entry);
        assert!(matches!(result, Err(RepositoryError::Sqlite(_))));
        assert_eq!(repo.load_card(id).unwrap().schedule, before);
    }

    #[test]
    fn test_unknown_card() {
        let (mut repo, _) = repository_with_card();
        let state = reviewed_state();
        let entry = ReviewLogEntry::new(77, 1, 5, &state, &state, start());

        assert!(matches!(repo.load_card(77), Err(RepositoryError::CardNotFound(77))));
        assert!(matches!(
            repo.update_card_schedule(77, &state),
            Err(RepositoryError::CardNotFound(77))
        ));
        assert!(matches!(
            repo.record_review(77, &state, &entry),
            Err(RepositoryError::CardNotFound(77))
        ));
        assert!(db::review_history(1, repo.conn()).unwrap().is_empty());
    }

    #[test]
    fn test_separate_writes() {
        let (mut repo, id) = repository_with_card();
        let before = repo.load_card(id).unwrap().schedule;
        let after = reviewed_state();

        repo.update_card_schedule(id, &after).unwrap();
        repo.append_review_log(&ReviewLogEntry::new(id, 1, 4, &before, &after, start()))
            .unwrap();

        assert_eq!(repo.list_cards_for_learner(1).unwrap()[0].schedule, after);
        assert_eq!(db::review_history(1, repo.conn()).unwrap().len(), 1);
        assert_eq!(repo.today().unwrap(), start());
    }
}
