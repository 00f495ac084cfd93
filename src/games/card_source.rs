use crate::games::card::{Card, MAX_RANK, MAX_SUIT, MIN_RANK, MIN_SUIT};
use rand::{rngs::OsRng, Rng};
use std::{collections::VecDeque, sync::Mutex};

/// Source of drawn cards
pub trait CardSource: Send + Sync {
    /// Draw one card, every rank/suit combination equally likely
    fn draw(&self) -> Card;
}

/// Draws from the operating system's CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCardSource;

impl CardSource for OsCardSource {
    fn draw(&self) -> Card {
        let rank = OsRng.gen_range(MIN_RANK..=MAX_RANK);
        let suit = OsRng.gen_range(MIN_SUIT..=MAX_SUIT);
        Card::from_valid(rank, suit)
    }
}

/// Deterministic source for scenario tests: hands out queued cards in order,
/// then keeps repeating the last one.
pub struct ScriptedCardSource {
    queue: Mutex<VecDeque<Card>>,
    last: Mutex<Card>,
}

impl ScriptedCardSource {
    pub fn new(cards: impl IntoIterator<Item = Card>) -> Self {
        let queue: VecDeque<Card> = cards.into_iter().collect();
        let last = queue.back().copied().unwrap_or(Card::from_valid(MIN_RANK, MIN_SUIT));
        Self {
            queue: Mutex::new(queue),
            last: Mutex::new(last),
        }
    }

    /// Always draws the same card
    pub fn repeating(card: Card) -> Self {
        Self::new([card])
    }

    pub fn push(&self, card: Card) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(card);
        }
    }
}

impl CardSource for ScriptedCardSource {
    fn draw(&self) -> Card {
        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(card) = queue.pop_front() {
            *last = card;
        }
        *last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_os_source_covers_deck() {
        let source = OsCardSource;
        let mut ranks = HashSet::new();
        let mut suits = HashSet::new();
        for _ in 0..2_000 {
            let card = source.draw();
            ranks.insert(card.rank());
            suits.insert(card.suit());
        }
        // 2000 draws miss a given rank with probability (12/13)^2000, effectively never.
        assert_eq!(ranks.len(), 13);
        assert_eq!(suits.len(), 4);
    }

    #[test]
    fn test_scripted_source_order_and_repeat() {
        let two = Card::new(2, 1).unwrap();
        let nine = Card::new(9, 4).unwrap();
        let source = ScriptedCardSource::new([two, nine]);

        assert_eq!(source.draw(), two);
        assert_eq!(source.draw(), nine);
        assert_eq!(source.draw(), nine);

        source.push(two);
        assert_eq!(source.draw(), two);
    }
}
