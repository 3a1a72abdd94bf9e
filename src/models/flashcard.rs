//! Flashcard is a pair <term, definition>: a Portuguese term and its English meaning
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

impl Flashcard {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }

    /// Both sides must contain something other than whitespace.
    pub fn is_valid(&self) -> bool {
        !self.term.trim().is_empty() && !self.definition.trim().is_empty()
    }
}
