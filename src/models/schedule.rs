//! Spaced repetition state attached to every flashcard.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest ease factor a card can reach.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a card that has never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Longest interval the scheduler hands out, roughly a hundred years.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardSchedulingState {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
}

impl CardSchedulingState {
    /// State of a freshly created card: due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            next_review_at: now,
        }
    }
}
