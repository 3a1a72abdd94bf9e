//! Review session management for spaced repetition practice.
//! Walks a learner through their cards one at a time and commits every grade
//! through the SM-2 scheduler.

use super::card::{Card, CardId, LearnerId};
use super::grade::default_allowed_grades;
use super::review_log::ReviewLogEntry;
use super::schedule::CardSchedulingState;
use super::sm2::{self, ScheduleInput};
use crate::database::{CardRepository, RepositoryError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which cards a session picks up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Only cards whose review time has come.
    #[default]
    Due,
    /// Every active card.
    All,
}

/// `Selecting` and `Grading` only last for the duration of `start` and
/// `grade_current_card`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Selecting,
    Presenting,
    Grading,
    Complete,
    /// Nothing to review. Not an error.
    Empty,
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Grade {0} is not accepted in this session")]
    InvalidGrade(u8),

    #[error(transparent)]
    Persistence(#[from] RepositoryError),

    #[error("No card is being presented")]
    NoCurrentCard,

    #[error("Cards can only be skipped while browsing")]
    NavigationNotAllowed,

    #[error("Cards cannot be graded while browsing")]
    GradingNotAllowed,
}

/// What to review.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub learner_id: LearnerId,
    pub mode: SessionMode,
    /// Restrict the session to one deck.
    pub deck_name: Option<String>,
    pub allowed_grades: Vec<u8>,
    /// Browsing sessions allow free navigation and no grading.
    pub browsing: bool,
}

impl SessionRequest {
    pub fn new(learner_id: LearnerId, mode: SessionMode) -> Self {
        Self {
            learner_id,
            mode,
            deck_name: None,
            allowed_grades: default_allowed_grades(),
            browsing: false,
        }
    }

    pub fn in_deck(mut self, deck_name: impl Into<String>) -> Self {
        self.deck_name = Some(deck_name.into());
        self
    }

    pub fn with_allowed_grades(mut self, allowed_grades: Vec<u8>) -> Self {
        self.allowed_grades = allowed_grades;
        self
    }

    pub fn browsing(mut self) -> Self {
        self.browsing = true;
        self
    }
}

/// Result of a committed grade.
#[derive(Clone, Debug, PartialEq)]
pub struct GradeOutcome {
    pub card_id: CardId,
    pub quality: u8,
    pub before: CardSchedulingState,
    pub after: CardSchedulingState,
}

impl GradeOutcome {
    pub fn is_success(&self) -> bool {
        sm2::is_success(self.quality)
    }
}

/// An in-memory review session. Dropping it abandons the session; grades
/// already committed stay in the repository.
pub struct ReviewSession {
    request: SessionRequest,
    cards: Vec<Card>,
    cursor: usize,
    correct: usize,
    total: usize,
    phase: SessionPhase,
}

impl ReviewSession {
    pub fn new(request: SessionRequest) -> Self {
        Self {
            request,
            cards: Vec::new(),
            cursor: 0,
            correct: 0,
            total: 0,
            phase: SessionPhase::Idle,
        }
    }

    /// Loads the learner's cards and presents the first one.
    ///
    /// Ends in `Empty` when no card matches. On a repository error the session
    /// keeps its previous state.
    pub fn start<R: CardRepository + ?Sized>(
        &mut self,
        repo: &R,
        now: DateTime<Utc>,
    ) -> Result<SessionPhase, ReviewError> {
        let previous = self.phase;
        self.phase = SessionPhase::Selecting;

        let loaded = match repo.list_cards_for_learner(self.request.learner_id) {
            Ok(cards) => cards,
            Err(e) => {
                log::warn!(
                    "Could not load cards for learner {}: {}",
                    self.request.learner_id,
                    e
                );
                self.phase = previous;
                return Err(e.into());
            }
        };

        self.cards = self.select_candidates(loaded, now);
        self.cursor = 0;
        self.correct = 0;
        self.total = 0;
        self.phase = if self.cards.is_empty() {
            SessionPhase::Empty
        } else {
            SessionPhase::Presenting
        };

        log::info!(
            "Started {:?} session for learner {} with {} cards",
            self.request.mode,
            self.request.learner_id,
            self.cards.len()
        );
        Ok(self.phase)
    }

    fn select_candidates(&self, cards: Vec<Card>, now: DateTime<Utc>) -> Vec<Card> {
        let mut candidates: Vec<Card> = cards
            .into_iter()
            .filter(|card| card.active && card.learner_id == self.request.learner_id)
            .filter(|card| match &self.request.deck_name {
                Some(deck) => &card.deck_name == deck,
                None => true,
            })
            .filter(|card| match self.request.mode {
                SessionMode::Due => sm2::is_due(card.schedule.next_review_at, now),
                SessionMode::All => true,
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.schedule
                .next_review_at
                .cmp(&b.schedule.next_review_at)
                .then(a.id.cmp(&b.id))
        });
        candidates
    }

    /// Grades the current card and moves on.
    ///
    /// The card is re-read from the repository and scheduled from its stored
    /// state, then the new schedule and the log entry are written together.
    /// Any failure leaves the cursor and the tally untouched, so the call can
    /// simply be repeated.
    pub fn grade_current_card<R: CardRepository + ?Sized>(
        &mut self,
        repo: &mut R,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<GradeOutcome, ReviewError> {
        if self.request.browsing {
            return Err(ReviewError::GradingNotAllowed);
        }
        if self.phase != SessionPhase::Presenting {
            return Err(ReviewError::NoCurrentCard);
        }
        if quality > 5 || !self.request.allowed_grades.contains(&quality) {
            return Err(ReviewError::InvalidGrade(quality));
        }

        let card_id = self.cards[self.cursor].id;
        self.phase = SessionPhase::Grading;

        let (stored, outcome) = match commit_grade(repo, card_id, quality, now) {
            Ok(committed) => committed,
            Err(e) => {
                log::warn!("Grading card {} failed: {}", card_id, e);
                self.phase = SessionPhase::Presenting;
                return Err(e.into());
            }
        };

        log::debug!(
            "Card {} graded {}: interval {} -> {}, ease {} -> {}",
            card_id,
            quality,
            outcome.before.interval_days,
            outcome.after.interval_days,
            outcome.before.ease_factor,
            outcome.after.ease_factor
        );

        self.cards[self.cursor] = Card {
            schedule: outcome.after.clone(),
            ..stored
        };
        self.total += 1;
        if outcome.is_success() {
            self.correct += 1;
        }
        self.advance();

        Ok(outcome)
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.cards.len() {
            self.phase = SessionPhase::Complete;
            log::info!(
                "Session complete for learner {}: {}/{} correct",
                self.request.learner_id,
                self.correct,
                self.total
            );
        } else {
            self.phase = SessionPhase::Presenting;
        }
    }

    /// Shows the next card without grading. Stays on the last card at the end.
    pub fn next_card(&mut self) -> Result<(), ReviewError> {
        self.check_browsing()?;
        if self.cursor + 1 < self.cards.len() {
            self.cursor += 1;
        }
        Ok(())
    }

    /// Shows the previous card without grading.
    pub fn previous_card(&mut self) -> Result<(), ReviewError> {
        self.check_browsing()?;
        self.cursor = self.cursor.saturating_sub(1);
        Ok(())
    }

    fn check_browsing(&self) -> Result<(), ReviewError> {
        if !self.request.browsing {
            return Err(ReviewError::NavigationNotAllowed);
        }
        if self.phase != SessionPhase::Presenting {
            return Err(ReviewError::NoCurrentCard);
        }
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn request(&self) -> &SessionRequest {
        &self.request
    }

    pub fn current_card(&self) -> Option<&Card> {
        match self.phase {
            SessionPhase::Presenting => self.cards.get(self.cursor),
            _ => None,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Zero-based index of the presented card.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.cards.len().saturating_sub(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Complete | SessionPhase::Empty)
    }

    pub fn phase_message(&self) -> String {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Selecting => "Loading cards...".to_string(),
            SessionPhase::Empty => "No cards to review".to_string(),
            SessionPhase::Complete => {
                format!("Session complete: {} / {} correct", self.correct, self.total)
            }
            SessionPhase::Presenting | SessionPhase::Grading if self.request.browsing => {
                format!("Browsing card {} of {}", self.cursor + 1, self.cards.len())
            }
            SessionPhase::Presenting | SessionPhase::Grading => format!(
                "Card {} of {} ({} correct so far)",
                self.cursor + 1,
                self.cards.len(),
                self.correct
            ),
        }
    }
}

fn commit_grade<R: CardRepository + ?Sized>(
    repo: &mut R,
    card_id: CardId,
    quality: u8,
    now: DateTime<Utc>,
) -> Result<(Card, GradeOutcome), RepositoryError> {
    let stored = repo.load_card(card_id)?;
    let after = sm2::schedule(ScheduleInput::from_state(&stored.schedule, quality), now);
    let entry = ReviewLogEntry::new(
        card_id,
        stored.learner_id,
        quality,
        &stored.schedule,
        &after,
        now,
    );

    repo.record_review(card_id, &after, &entry)?;

    let outcome = GradeOutcome {
        card_id,
        quality,
        before: stored.schedule.clone(),
        after,
    };
    Ok((stored, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository;
    use crate::models::Flashcard;
    use crate::models::schedule::MAX_INTERVAL_DAYS;
    use chrono::{Duration, TimeZone};

    #[derive(Default)]
    struct FakeRepository {
        cards: Vec<Card>,
        log: Vec<ReviewLogEntry>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl FakeRepository {
        fn stored(&self, card_id: CardId) -> &Card {
            self.cards.iter().find(|c| c.id == card_id).unwrap()
        }
    }

    impl CardRepository for FakeRepository {
        fn list_cards_for_learner(&self, learner_id: LearnerId) -> repository::Result<Vec<Card>> {
            if self.fail_reads {
                return Err(RepositoryError::Unavailable("offline".to_string()));
            }
            Ok(self
                .cards
                .iter()
                .filter(|c| c.learner_id == learner_id)
                .cloned()
                .collect())
        }

        fn load_card(&self, card_id: CardId) -> repository::Result<Card> {
            if self.fail_reads {
                return Err(RepositoryError::Unavailable("offline".to_string()));
            }
            self.cards
                .iter()
                .find(|c| c.id == card_id)
                .cloned()
                .ok_or(RepositoryError::CardNotFound(card_id))
        }

        fn update_card_schedule(
            &mut self,
            card_id: CardId,
            state: &CardSchedulingState,
        ) -> repository::Result<()> {
            if self.fail_writes {
                return Err(RepositoryError::Unavailable("read-only".to_string()));
            }
            let card = self
                .cards
                .iter_mut()
                .find(|c| c.id == card_id)
                .ok_or(RepositoryError::CardNotFound(card_id))?;
            card.schedule = state.clone();
            Ok(())
        }

        fn append_review_log(&mut self, entry: &ReviewLogEntry) -> repository::Result<()> {
            if self.fail_writes {
                return Err(RepositoryError::Unavailable("read-only".to_string()));
            }
            self.log.push(entry.clone());
            Ok(())
        }

        fn record_review(
            &mut self,
            card_id: CardId,
            state: &CardSchedulingState,
            entry: &ReviewLogEntry,
        ) -> repository::Result<()> {
            self.update_card_schedule(card_id, state)?;
            self.append_review_log(entry)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
    }

    fn card(id: CardId, deck: &str, due_in_days: i64) -> Card {
        Card {
            id,
            learner_id: 1,
            deck_name: deck.to_string(),
            flashcard: Flashcard::new(format!("palavra {id}"), format!("word {id}")),
            active: true,
            schedule: CardSchedulingState {
                ease_factor: 2.5,
                interval_days: 6,
                repetitions: 2,
                next_review_at: now() + Duration::days(due_in_days),
            },
        }
    }

    fn repo_with(cards: Vec<Card>) -> FakeRepository {
        FakeRepository {
            cards,
            ..Default::default()
        }
    }

    fn started(repo: &FakeRepository, request: SessionRequest) -> ReviewSession {
        let mut session = ReviewSession::new(request);
        session.start(repo, now()).unwrap();
        session
    }

    fn ids(session: &ReviewSession) -> Vec<CardId> {
        session.cards().iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = ReviewSession::new(SessionRequest::new(1, SessionMode::Due));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.current_card().is_none());
    }

    #[test]
    fn test_no_due_cards_ends_empty() {
        let repo = repo_with(vec![card(1, "Comida", 3), card(2, "Comida", 10)]);
        let session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        assert_eq!(session.phase(), SessionPhase::Empty);
        assert_eq!(session.correct_count(), 0);
        assert_eq!(session.total_count(), 0);
        assert!(session.is_finished());
        assert_eq!(session.phase_message(), "No cards to review");
    }

    #[test]
    fn test_due_mode_filters_and_orders_by_due_date() {
        let mut suspended = card(4, "Comida", -5);
        suspended.active = false;
        let mut other_learner = card(5, "Comida", -5);
        other_learner.learner_id = 2;
        let repo = repo_with(vec![
            card(1, "Comida", 0),
            card(2, "Comida", -2),
            card(3, "Comida", 1),
            suspended,
            other_learner,
            card(6, "Viagem", -2),
        ]);

        let session = started(&repo, SessionRequest::new(1, SessionMode::Due));
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert_eq!(ids(&session), vec![2, 6, 1]);
        assert_eq!(session.current_card().unwrap().id, 2);
    }

    #[test]
    fn test_all_mode_and_deck_filter() {
        let repo = repo_with(vec![
            card(1, "Comida", 4),
            card(2, "Viagem", -1),
            card(3, "Comida", 1),
        ]);

        let all = started(&repo, SessionRequest::new(1, SessionMode::All));
        assert_eq!(ids(&all), vec![2, 3, 1]);

        let comida = started(&repo, SessionRequest::new(1, SessionMode::All).in_deck("Comida"));
        assert_eq!(ids(&comida), vec![3, 1]);
    }

    #[test]
    fn test_grade_persists_schedule_and_log() {
        let mut repo = repo_with(vec![card(1, "Comida", 0), card(2, "Comida", 0)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        let outcome = session.grade_current_card(&mut repo, 5, now()).unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.after.ease_factor, 2.6);
        assert_eq!(outcome.after.interval_days, 15);
        assert_eq!(outcome.after.repetitions, 3);
        assert_eq!(repo.stored(1).schedule, outcome.after);
        assert_eq!(
            repo.log,
            vec![ReviewLogEntry {
                card_id: 1,
                learner_id: 1,
                quality: 5,
                ease_before: 2.5,
                ease_after: 2.6,
                interval_before: 6,
                interval_after: 15,
                reviewed_at: now(),
            }]
        );
        assert_eq!(session.cards()[0].schedule, outcome.after);
        assert_eq!(session.current_card().unwrap().id, 2);
        assert_eq!((session.correct_count(), session.total_count()), (1, 1));
    }

    #[test]
    fn test_session_completes_with_tally() {
        let mut repo = repo_with(vec![card(1, "Comida", 0), card(2, "Comida", -1)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        let lapse = session.grade_current_card(&mut repo, 1, now()).unwrap();
        assert!(!lapse.is_success());
        assert_eq!(lapse.after.interval_days, 1);
        assert_eq!(lapse.after.repetitions, 0);
        assert_eq!(lapse.after.ease_factor, 2.5);

        session.grade_current_card(&mut repo, 3, now()).unwrap();

        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(session.current_card().is_none());
        assert_eq!(session.correct_count(), 1);
        assert_eq!(session.total_count(), 2);
        assert_eq!(session.remaining_count(), 0);
        assert_eq!(repo.log.len(), 2);
        assert!(matches!(
            session.grade_current_card(&mut repo, 5, now()),
            Err(ReviewError::NoCurrentCard)
        ));
    }

    #[test]
    fn test_invalid_grade_is_rejected_without_side_effects() {
        let mut repo = repo_with(vec![card(1, "Comida", 0)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        for quality in [2, 4, 6, 200] {
            assert!(matches!(
                session.grade_current_card(&mut repo, quality, now()),
                Err(ReviewError::InvalidGrade(q)) if q == quality
            ));
        }

        assert!(repo.log.is_empty());
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert_eq!(session.total_count(), 0);
    }

    #[test]
    fn test_custom_grade_set() {
        let mut repo = repo_with(vec![card(1, "Comida", 0)]);
        let request =
            SessionRequest::new(1, SessionMode::Due).with_allowed_grades((0..=5).collect());
        let mut session = started(&repo, request);

        let outcome = session.grade_current_card(&mut repo, 4, now()).unwrap();
        assert_eq!(outcome.after.interval_days, 15);
    }

    #[test]
    fn test_persistence_failure_does_not_advance_and_retry_succeeds() {
        let mut repo = repo_with(vec![card(1, "Comida", 0), card(2, "Comida", 0)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        repo.fail_writes = true;
        let err = session.grade_current_card(&mut repo, 5, now()).unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Persistence(RepositoryError::Unavailable(_))
        ));
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert_eq!(session.current_card().unwrap().id, 1);
        assert_eq!(session.total_count(), 0);
        assert!(repo.log.is_empty());

        repo.fail_writes = false;
        let outcome = session.grade_current_card(&mut repo, 5, now()).unwrap();
        assert_eq!(outcome.card_id, 1);
        assert_eq!(outcome.after.interval_days, 15);
        assert_eq!(repo.log.len(), 1);
        assert_eq!(session.current_card().unwrap().id, 2);
    }

    #[test]
    fn test_grading_uses_stored_state() {
        let mut repo = repo_with(vec![card(1, "Comida", 0)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        // Graded elsewhere after the session loaded its copy
        repo.cards[0].schedule = CardSchedulingState {
            ease_factor: 2.6,
            interval_days: 15,
            repetitions: 3,
            next_review_at: now(),
        };

        let outcome = session.grade_current_card(&mut repo, 5, now()).unwrap();
        assert_eq!(outcome.before.interval_days, 15);
        assert_eq!(outcome.after.interval_days, 39);
        assert_eq!(outcome.after.ease_factor, 2.7);
        assert_eq!(outcome.after.repetitions, 4);
    }

    #[test]
    fn test_load_failure_keeps_session_idle() {
        let repo = FakeRepository {
            cards: vec![card(1, "Comida", 0)],
            fail_reads: true,
            ..Default::default()
        };
        let mut session = ReviewSession::new(SessionRequest::new(1, SessionMode::Due));

        assert!(matches!(
            session.start(&repo, now()),
            Err(ReviewError::Persistence(_))
        ));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_browsing_navigation() {
        let mut repo = repo_with(vec![
            card(1, "Comida", 0),
            card(2, "Comida", 1),
            card(3, "Comida", 2),
        ]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::All).browsing());

        session.previous_card().unwrap();
        assert_eq!(session.position(), 0);
        session.next_card().unwrap();
        session.next_card().unwrap();
        session.next_card().unwrap();
        assert_eq!(session.current_card().unwrap().id, 3);
        session.previous_card().unwrap();
        assert_eq!(session.current_card().unwrap().id, 2);
        assert_eq!(session.phase_message(), "Browsing card 2 of 3");

        assert!(matches!(
            session.grade_current_card(&mut repo, 5, now()),
            Err(ReviewError::GradingNotAllowed)
        ));
        assert!(repo.log.is_empty());
        assert_eq!(repo.stored(2).schedule, card(2, "Comida", 1).schedule);
    }

    #[test]
    fn test_review_session_rejects_navigation() {
        let repo = repo_with(vec![card(1, "Comida", 0), card(2, "Comida", 0)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));

        assert!(matches!(session.next_card(), Err(ReviewError::NavigationNotAllowed)));
        assert!(matches!(session.previous_card(), Err(ReviewError::NavigationNotAllowed)));
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn test_repeated_all_mode_reviews_stay_in_range() {
        let mut repo = repo_with(vec![card(1, "Comida", 0)]);
        let mut session = ReviewSession::new(SessionRequest::new(1, SessionMode::All));

        // All mode offers the card again every session, due or not
        for _ in 0..60 {
            assert_eq!(session.start(&repo, now()).unwrap(), SessionPhase::Presenting);
            let current = session.current_card().unwrap().schedule.clone();
            for (_, days) in sm2::preview_intervals(&current, &[0, 1, 3, 5], now()) {
                assert!(days <= MAX_INTERVAL_DAYS);
            }
            session.grade_current_card(&mut repo, 5, now()).unwrap();
            assert_eq!(session.phase(), SessionPhase::Complete);
        }

        let stored = &repo.stored(1).schedule;
        assert_eq!(stored.repetitions, 62);
        assert_eq!(stored.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(
            stored.next_review_at,
            now() + Duration::days(i64::from(MAX_INTERVAL_DAYS))
        );
        assert_eq!(repo.log.len(), 60);
    }

    #[test]
    fn test_restart_reloads_cards() {
        let mut repo = repo_with(vec![card(1, "Comida", 0)]);
        let mut session = started(&repo, SessionRequest::new(1, SessionMode::Due));
        session.grade_current_card(&mut repo, 5, now()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Complete);

        // Graded card is now 15 days out
        assert_eq!(session.start(&repo, now()).unwrap(), SessionPhase::Empty);
        assert_eq!(session.total_count(), 0);
    }
}
