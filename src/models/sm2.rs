//! SM-2 (SuperMemo 2) spaced repetition scheduler.
//!
//! The scheduler maps a recall quality and a card's current state to its next state:
//! - Quality grades 0-2 are lapses: repetitions reset, the card comes back tomorrow,
//!   and the ease factor is left untouched
//! - Quality grades 3-5 are successes: interval grows 1 day → 6 days → interval × EF
//! - Only successes adjust EF, which never falls below 1.3 and is kept to two decimals
//!
//! Everything here is pure. The caller supplies "now", which keeps results reproducible.

use super::schedule::{CardSchedulingState, MAX_INTERVAL_DAYS, MIN_EASE_FACTOR};
use chrono::{DateTime, Duration, Utc};

/// Lowest quality that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Scheduling inputs for a single review.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleInput {
    /// 0-5. Values above 5 are a caller error.
    pub quality: u8,
    /// Assumed to be at least 1.3.
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
}

impl ScheduleInput {
    pub fn from_state(state: &CardSchedulingState, quality: u8) -> Self {
        Self {
            quality,
            ease_factor: state.ease_factor,
            interval_days: state.interval_days,
            repetitions: state.repetitions,
        }
    }
}

/// Computes the next scheduling state of a card.
///
/// Total over `quality` in 0..=5 and `ease_factor >= 1.3`. Intervals are capped at
/// [`MAX_INTERVAL_DAYS`], so long streaks of successes never overflow the date.
pub fn schedule(input: ScheduleInput, now: DateTime<Utc>) -> CardSchedulingState {
    debug_assert!(input.quality <= 5, "quality out of range: {}", input.quality);

    let (ease_factor, interval_days, repetitions) = if input.quality >= PASSING_QUALITY {
        let interval = match input.repetitions {
            0 => 1,
            1 => 6,
            _ => (f64::from(input.interval_days) * input.ease_factor)
                .round()
                .min(f64::from(MAX_INTERVAL_DAYS)) as u32,
        };

        let q = f64::from(input.quality);
        let ef = (input.ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
            .max(MIN_EASE_FACTOR);

        (round_ease(ef), interval, input.repetitions + 1)
    } else {
        (input.ease_factor, 1, 0)
    };

    CardSchedulingState {
        ease_factor,
        interval_days,
        repetitions,
        next_review_at: due_after(now, interval_days),
    }
}

/// `now` plus the interval, saturating at the latest representable instant.
fn due_after(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn round_ease(ef: f64) -> f64 {
    (ef * 100.0).round() / 100.0
}

/// A card is due once its review time is at or before `now`.
pub fn is_due(next_review_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    next_review_at <= now
}

/// Whether a quality grade counts as remembering the card.
pub fn is_success(quality: u8) -> bool {
    quality >= PASSING_QUALITY
}

/// Human readable interval, e.g. "6d", "2w", "3mo".
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

/// Display label for a raw 0-5 quality.
pub fn quality_label(quality: u8) -> &'static str {
    match quality {
        0 => "Blackout",
        1 => "Wrong",
        2 => "Wrong (familiar)",
        3 => "Difficult",
        4 => "Correct",
        5 => "Perfect",
        _ => "Unknown",
    }
}

/// Interval each quality would produce, for labelling grade buttons.
pub fn preview_intervals(
    state: &CardSchedulingState,
    qualities: &[u8],
    now: DateTime<Utc>,
) -> Vec<(u8, u32)> {
    qualities
        .iter()
        .map(|&quality| {
            let next = schedule(ScheduleInput::from_state(state, quality), now);
            (quality, next.interval_days)
        })
        .collect()
}

/// Recomputes a card's state from its review history, oldest review first.
///
/// Used for bulk recomputation after the scheduling rules change.
pub fn replay_history<I>(initial: CardSchedulingState, reviews: I) -> CardSchedulingState
where
    I: IntoIterator<Item = (u8, DateTime<Utc>)>,
{
    reviews.into_iter().fold(initial, |state, (quality, reviewed_at)| {
        schedule(ScheduleInput::from_state(&state, quality), reviewed_at)
    })
}
