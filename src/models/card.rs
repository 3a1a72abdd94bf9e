//! A learner's flashcard together with its review schedule.
use super::{CardSchedulingState, Flashcard};
use serde::{Deserialize, Serialize};

pub type CardId = i64;
pub type LearnerId = i64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub learner_id: LearnerId,
    pub deck_name: String,
    pub flashcard: Flashcard,
    /// Suspended cards are never offered for review.
    pub active: bool,
    pub schedule: CardSchedulingState,
}
