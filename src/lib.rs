pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod sample;

pub use database::{CardRepository, RepositoryError, SqliteRepository};
pub use error::AppError;
pub use models::{
    Card, CardSchedulingState, Deck, DeckSet, Flashcard, Grade, ReviewError, ReviewLogEntry,
    ReviewSession, SessionMode, SessionPhase, SessionRequest,
};
pub use models::sm2::{schedule, ScheduleInput};
