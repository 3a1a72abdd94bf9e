//! Container for all decks of the current learner
use super::Deck;

#[derive(Clone, Debug, Default)]
pub struct DeckSet {
    pub decks: Vec<Deck>,
}

impl DeckSet {
    pub fn contains(&self, name: &str) -> bool {
        self.decks.iter().any(|deck| deck.name == name)
    }

    pub fn total_cards(&self) -> usize {
        self.decks.iter().map(|deck| deck.flashcards.len()).sum()
    }
}
