//! Append-only review history.
//!
//! Entries are written once per graded review and never updated. The
//! scheduler does not read them; they exist for reporting and for
//! `sm2::replay_history`.
use super::card::{CardId, LearnerId};
use super::CardSchedulingState;
use super::sm2::is_success;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub card_id: CardId,
    pub learner_id: LearnerId,
    pub quality: u8,
    pub ease_before: f64,
    pub ease_after: f64,
    pub interval_before: u32,
    pub interval_after: u32,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLogEntry {
    pub fn new(
        card_id: CardId,
        learner_id: LearnerId,
        quality: u8,
        before: &CardSchedulingState,
        after: &CardSchedulingState,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            card_id,
            learner_id,
            quality,
            ease_before: before.ease_factor,
            ease_after: after.ease_factor,
            interval_before: before.interval_days,
            interval_after: after.interval_days,
            reviewed_at,
        }
    }
}

/// Summary of a learner's review history.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: usize,
    pub successful_reviews: usize,
    pub lapses: usize,
    pub reviews_today: usize,
}

impl ReviewStats {
    /// `today_start` is the first instant of the learner's current day.
    pub fn from_entries(entries: &[ReviewLogEntry], today_start: DateTime<Utc>) -> Self {
        let successful_reviews = entries.iter().filter(|e| is_success(e.quality)).count();
        Self {
            total_reviews: entries.len(),
            successful_reviews,
            lapses: entries.len() - successful_reviews,
            reviews_today: entries
                .iter()
                .filter(|e| e.reviewed_at >= today_start)
                .count(),
        }
    }

    /// Share of successful reviews, 0.0 when nothing was reviewed yet.
    pub fn success_rate(&self) -> f64 {
        if self.total_reviews == 0 {
            0.0
        } else {
            self.successful_reviews as f64 / self.total_reviews as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(quality: u8, reviewed_at: DateTime<Utc>) -> ReviewLogEntry {
        let state = CardSchedulingState::new(reviewed_at);
        ReviewLogEntry::new(1, 1, quality, &state, &state, reviewed_at)
    }

    #[test]
    fn test_stats_from_entries() {
        let today = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let entries = vec![
            entry(5, today - Duration::days(2)),
            entry(1, today - Duration::days(1)),
            entry(3, today + Duration::hours(8)),
            entry(0, today + Duration::hours(9)),
        ];

        let stats = ReviewStats::from_entries(&entries, today);
        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.successful_reviews, 2);
        assert_eq!(stats.lapses, 2);
        assert_eq!(stats.reviews_today, 2);
        assert_eq!(stats.success_rate(), 0.5);
    }

    #[test]
    fn test_empty_stats() {
        let stats = ReviewStats::from_entries(&[], Utc::now());
        assert_eq!(stats, ReviewStats::default());
        assert_eq!(stats.success_rate(), 0.0);
    }
}
