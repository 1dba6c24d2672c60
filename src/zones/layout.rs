//! Group/position index over the live table.
//!
//! Every card sits in exactly one group (a pile on the table) at a position
//! within it. Position 0 is the head of a pile; the card with the highest
//! position is its foot. A valid pile has no gaps: its positions are
//! `0..len`.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::{Card, CardValue, Deck};

/// A broken table invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Live slot `slot` holds a different identity.
    #[error("slot {slot} holds card {value}")]
    MisplacedCard { slot: usize, value: CardValue },

    /// A card is in a group the game does not define.
    #[error("card {value} is in unknown group {group}")]
    UnknownGroup { value: CardValue, group: u16 },

    /// Two cards share a position.
    #[error("group {group} has two cards at position {position}")]
    DuplicatePosition { group: u16, position: u16 },

    /// A pile skips a position.
    #[error("group {group} expected position {expected}, found {found}")]
    PositionGap { group: u16, expected: u16, found: u16 },
}

/// Cards of the live table indexed by group, each group in position order.
///
/// ## Usage
///
/// ```
/// use rust_solitaire::core::{Card, CardFlags, CardValue, Deck};
/// use rust_solitaire::zones::Layout;
///
/// let cards: Deck = std::array::from_fn(|i| {
///     Card::new(0, CardValue::new(i as u8), (i % 2) as u16, (i / 2) as u16, CardFlags::default())
/// });
/// let layout = Layout::new(&cards);
///
/// assert_eq!(layout.len(1), 26);
/// assert_eq!(layout.foot(0), Some(CardValue::new(50)));
/// assert_eq!(Layout::validate(&cards, 1), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Layout {
    piles: FxHashMap<u16, Vec<Card>>,
}

impl Layout {
    /// Index `cards` by group.
    #[must_use]
    pub fn new(cards: &[Card]) -> Self {
        let mut piles: FxHashMap<u16, Vec<Card>> = FxHashMap::default();
        for card in cards {
            piles.entry(card.group()).or_default().push(*card);
        }
        for pile in piles.values_mut() {
            pile.sort_by_key(|card| (card.position(), card.value()));
        }
        Self { piles }
    }

    /// Cards in `group`, head first.
    #[must_use]
    pub fn group(&self, group: u16) -> &[Card] {
        self.piles.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Card values in `group`, head first.
    #[must_use]
    pub fn values(&self, group: u16) -> Vec<CardValue> {
        self.group(group).iter().map(Card::value).collect()
    }

    /// The card with the highest position in `group`.
    #[must_use]
    pub fn foot(&self, group: u16) -> Option<CardValue> {
        self.group(group).last().map(Card::value)
    }

    /// The card at position 0 of `group`.
    #[must_use]
    pub fn head(&self, group: u16) -> Option<CardValue> {
        self.group(group).first().map(Card::value)
    }

    /// `card` and every card after it in its group.
    #[must_use]
    pub fn run_from(&self, card: &Card) -> &[Card] {
        let pile = self.group(card.group());
        match pile.iter().position(|c| c.value() == card.value()) {
            Some(index) => &pile[index..],
            None => &[],
        }
    }

    #[must_use]
    pub fn len(&self, group: u16) -> usize {
        self.group(group).len()
    }

    #[must_use]
    pub fn is_empty(&self, group: u16) -> bool {
        self.len(group) == 0
    }

    /// Non-empty groups, ascending.
    #[must_use]
    pub fn groups(&self) -> Vec<u16> {
        let mut groups: Vec<u16> = self.piles.keys().copied().collect();
        groups.sort_unstable();
        groups
    }

    /// First broken invariant of `cards`, if any.
    ///
    /// Checks that slot `i` holds identity `i`, that no card is above
    /// `max_group`, and that every pile's positions are exactly `0..len`.
    #[must_use]
    pub fn validate(cards: &Deck, max_group: u16) -> Option<LayoutError> {
        if let Some((slot, card)) = cards
            .iter()
            .enumerate()
            .find(|(slot, card)| card.value().index() != *slot)
        {
            return Some(LayoutError::MisplacedCard { slot, value: card.value() });
        }
        if let Some(card) = cards.iter().find(|card| card.group() > max_group) {
            return Some(LayoutError::UnknownGroup {
                value: card.value(),
                group: card.group(),
            });
        }

        let layout = Self::new(cards);
        for group in layout.groups() {
            for (expected, card) in layout.group(group).iter().enumerate() {
                let expected = expected as u16;
                if card.position() == expected {
                    continue;
                }
                if expected > 0 && card.position() == expected - 1 {
                    return Some(LayoutError::DuplicatePosition {
                        group,
                        position: card.position(),
                    });
                }
                return Some(LayoutError::PositionGap {
                    group,
                    expected,
                    found: card.position(),
                });
            }
        }
        None
    }
}
