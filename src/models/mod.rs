pub mod card;
pub mod deck;
pub mod deck_set;
pub mod flashcard;
pub mod grade;
pub mod review_log;
pub mod review_session;
pub mod schedule;
pub mod sm2;

pub use card::{Card, CardId, LearnerId};
pub use deck::Deck;
pub use deck_set::DeckSet;
pub use flashcard::Flashcard;
pub use grade::Grade;
pub use review_log::{ReviewLogEntry, ReviewStats};
pub use review_session::{
    GradeOutcome, ReviewError, ReviewSession, SessionMode, SessionPhase, SessionRequest,
};
pub use schedule::CardSchedulingState;
