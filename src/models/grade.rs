//! The coarse grades offered on the review screen.
//!
//! The scheduler works on the full 0-5 quality range; the screen only offers
//! four buttons. Which qualities are accepted in a session is configured
//! separately (see `AppConfig::allowed_grades`).
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Perfect,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Perfect];

    pub fn quality(self) -> u8 {
        match self {
            Grade::Again => 0,
            Grade::Hard => 1,
            Grade::Good => 3,
            Grade::Perfect => 5,
        }
    }

    pub fn from_quality(quality: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|grade| grade.quality() == quality)
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Again => "Again",
            Grade::Hard => "Hard",
            Grade::Good => "Good",
            Grade::Perfect => "Perfect",
        }
    }
}

/// Qualities accepted by a review session unless configured otherwise.
pub fn default_allowed_grades() -> Vec<u8> {
    Grade::ALL.iter().map(|grade| grade.quality()).collect()
}
