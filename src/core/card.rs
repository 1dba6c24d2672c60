//! Card identities, flags, and the immutable per-generation card record.
//!
//! ## Value Encoding
//!
//! A card identity is `suit * 13 + rank`:
//! - suit: 0 = Spades, 1 = Hearts, 2 = Clubs, 3 = Diamonds
//! - rank: 0 = Ace .. 12 = King
//!
//! ## Flags Byte
//!
//! ```text
//! bit  7 6 5 | 4      | 3         | 2 1 0
//!      pass  | spread | face-down | highlight
//! ```
//!
//! The pass bits are only used by games that recycle a stock pile.
//!
//! ## Usage
//!
//! ```
//! use rust_solitaire::core::{Card, CardFlags, CardValue, Rank, Suit};
//!
//! let queen = CardValue::from_parts(Suit::Hearts, Rank::Queen);
//! assert_eq!(queen.raw(), 24);
//!
//! let card = Card::new(0, queen, 3, 5, CardFlags::default().with_face_down(true));
//! let flipped = card.with_face_down(false).with_generation(1);
//!
//! assert!(card.face_down());
//! assert!(flipped.face_up());
//! assert_eq!(flipped.group(), 3);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of cards in the deck.
pub const DECK_SIZE: usize = 52;

/// Number of ranks per suit.
pub const RANK_COUNT: u8 = 13;

/// The live card array, indexed by identity.
pub type Deck = [Card; DECK_SIZE];

/// The four suits, in encoding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    Spades = 0,
    Hearts = 1,
    Clubs = 2,
    Diamonds = 3,
}

impl Suit {
    /// All suits in encoding order.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Clubs, Suit::Diamonds];

    /// Suit from its encoded index.
    #[must_use]
    pub fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index)]
    }

    fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
        }
    }
}

/// The thirteen ranks, Ace low.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    Ace = 0,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    /// All ranks, Ace first.
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Rank from its encoded index (0 = Ace).
    #[must_use]
    pub fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index)]
    }

    /// Pip value, 1 for Ace through 13 for King.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    fn symbol(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

/// Identity of one of the 52 deck cards.
///
/// Deserializing checks the range, so a corrupt snapshot fails to load
/// instead of producing an identity outside the deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CardValue(u8);

/// A byte that does not name a deck card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("card value {0} out of range")]
pub struct InvalidCardValue(pub u8);

impl TryFrom<u8> for CardValue {
    type Error = InvalidCardValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if usize::from(value) < DECK_SIZE {
            Ok(Self(value))
        } else {
            Err(InvalidCardValue(value))
        }
    }
}

impl From<CardValue> for u8 {
    fn from(value: CardValue) -> u8 {
        value.0
    }
}

impl CardValue {
    /// Create a card identity.
    ///
    /// Panics if `value` is not in `0..52`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        assert!((value as usize) < DECK_SIZE, "Card value out of range");
        Self(value)
    }

    /// Identity for a suit and rank.
    #[must_use]
    pub const fn from_parts(suit: Suit, rank: Rank) -> Self {
        Self(suit as u8 * RANK_COUNT + rank as u8)
    }

    /// Iterate over all identities in ascending order.
    pub fn all() -> impl Iterator<Item = CardValue> {
        (0..DECK_SIZE as u8).map(CardValue)
    }

    /// Raw encoded value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Index into a [`Deck`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn suit(self) -> Suit {
        Suit::from_index(self.0 / RANK_COUNT)
    }

    #[must_use]
    pub fn rank(self) -> Rank {
        Rank::from_index(self.0 % RANK_COUNT)
    }

    #[must_use]
    pub fn is_king(self) -> bool {
        self.rank() == Rank::King
    }

    /// Same suit, one rank higher. `None` for a King.
    #[must_use]
    pub fn next_higher(self) -> Option<CardValue> {
        if self.is_king() {
            None
        } else {
            Some(CardValue(self.0 + 1))
        }
    }

    /// Same suit, one rank lower. `None` for an Ace.
    #[must_use]
    pub fn next_lower(self) -> Option<CardValue> {
        if self.rank() == Rank::Ace {
            None
        } else {
            Some(CardValue(self.0 - 1))
        }
    }
}

impl std::fmt::Display for CardValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank().symbol(), self.suit().symbol())
    }
}

/// Packed card flags. See the module docs for the bit layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardFlags(u8);

impl CardFlags {
    /// Highlight code bits.
    pub const HIGHLIGHT_MASK: u8 = 0b0000_0111;
    /// Card shows its back.
    pub const FACE_DOWN: u8 = 0b0000_1000;
    /// Card is offset from its neighbour.
    pub const SPREAD: u8 = 0b0001_0000;
    /// Stock recycle pass counter.
    pub const PASS_MASK: u8 = 0b1110_0000;
    const PASS_SHIFT: u8 = 5;

    /// Largest pass number the flags can hold.
    pub const MAX_PASS: u8 = Self::PASS_MASK >> Self::PASS_SHIFT;

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn highlight(self) -> u8 {
        self.0 & Self::HIGHLIGHT_MASK
    }

    #[must_use]
    pub const fn face_down(self) -> bool {
        self.0 & Self::FACE_DOWN != 0
    }

    #[must_use]
    pub const fn spread(self) -> bool {
        self.0 & Self::SPREAD != 0
    }

    #[must_use]
    pub const fn pass(self) -> u8 {
        (self.0 & Self::PASS_MASK) >> Self::PASS_SHIFT
    }

    /// Replace the highlight code. Panics if it does not fit in 3 bits.
    #[must_use]
    pub fn with_highlight(self, code: u8) -> Self {
        assert!(code <= Self::HIGHLIGHT_MASK, "Highlight code {} out of range", code);
        Self((self.0 & !Self::HIGHLIGHT_MASK) | code)
    }

    #[must_use]
    pub fn with_face_down(self, face_down: bool) -> Self {
        self.with_bit(Self::FACE_DOWN, face_down)
    }

    #[must_use]
    pub fn with_spread(self, spread: bool) -> Self {
        self.with_bit(Self::SPREAD, spread)
    }

    /// Replace the pass counter. Panics above [`CardFlags::MAX_PASS`].
    #[must_use]
    pub fn with_pass(self, pass: u8) -> Self {
        assert!(pass <= Self::MAX_PASS, "Pass {} out of range", pass);
        Self((self.0 & !Self::PASS_MASK) | (pass << Self::PASS_SHIFT))
    }

    fn with_bit(self, bit: u8, set: bool) -> Self {
        if set {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

/// One card identity at one generation.
///
/// Cards are never edited in place: every `with_*` method returns a new
/// record, which the dealer stages as a delta for the next generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    generation: u64,
    value: CardValue,
    group: u16,
    position: u16,
    flags: CardFlags,
}

impl Card {
    /// Create a card record.
    #[must_use]
    pub const fn new(
        generation: u64,
        value: CardValue,
        group: u16,
        position: u16,
        flags: CardFlags,
    ) -> Self {
        Self {
            generation,
            value,
            group,
            position,
            flags,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn value(&self) -> CardValue {
        self.value
    }

    #[must_use]
    pub const fn group(&self) -> u16 {
        self.group
    }

    #[must_use]
    pub const fn position(&self) -> u16 {
        self.position
    }

    #[must_use]
    pub const fn flags(&self) -> CardFlags {
        self.flags
    }

    #[must_use]
    pub const fn face_down(&self) -> bool {
        self.flags.face_down()
    }

    #[must_use]
    pub const fn face_up(&self) -> bool {
        !self.flags.face_down()
    }

    #[must_use]
    pub const fn spread(&self) -> bool {
        self.flags.spread()
    }

    #[must_use]
    pub const fn highlight(&self) -> u8 {
        self.flags.highlight()
    }

    #[must_use]
    pub const fn pass(&self) -> u8 {
        self.flags.pass()
    }

    #[must_use]
    pub fn with_generation(self, generation: u64) -> Self {
        Self { generation, ..self }
    }

    #[must_use]
    pub fn with_group(self, group: u16) -> Self {
        Self { group, ..self }
    }

    #[must_use]
    pub fn with_position(self, position: u16) -> Self {
        Self { position, ..self }
    }

    /// Move to a group and position in one step.
    #[must_use]
    pub fn moved_to(self, group: u16, position: u16) -> Self {
        Self {
            group,
            position,
            ..self
        }
    }

    #[must_use]
    pub fn with_flags(self, flags: CardFlags) -> Self {
        Self { flags, ..self }
    }

    #[must_use]
    pub fn with_face_down(self, face_down: bool) -> Self {
        self.with_flags(self.flags.with_face_down(face_down))
    }

    #[must_use]
    pub fn with_spread(self, spread: bool) -> Self {
        self.with_flags(self.flags.with_spread(spread))
    }

    #[must_use]
    pub fn with_highlight(self, code: u8) -> Self {
        self.with_flags(self.flags.with_highlight(code))
    }

    #[must_use]
    pub fn with_pass(self, pass: u8) -> Self {
        self.with_flags(self.flags.with_pass(pass))
    }

    /// Equal in every field except the generation tag.
    #[must_use]
    pub fn same_state(&self, other: &Card) -> bool {
        self.value == other.value
            && self.group == other.group
            && self.position == other.position
            && self.flags == other.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_encoding() {
        assert_eq!(CardValue::from_parts(Suit::Spades, Rank::Ace).raw(), 0);
        assert_eq!(CardValue::from_parts(Suit::Hearts, Rank::Ace).raw(), 13);
        assert_eq!(CardValue::from_parts(Suit::Clubs, Rank::Seven).raw(), 32);
        assert_eq!(CardValue::from_parts(Suit::Diamonds, Rank::King).raw(), 51);

        let card = CardValue::new(38);
        assert_eq!(card.suit(), Suit::Clubs);
        assert_eq!(card.rank(), Rank::King);
        assert!(card.is_king());
    }

    #[test]
    #[should_panic(expected = "Card value out of range")]
    fn test_value_out_of_range() {
        let _ = CardValue::new(52);
    }

    #[test]
    fn test_value_deserialize_checks_range() {
        let queen: CardValue = serde_json::from_str("24").unwrap();
        assert_eq!(queen, CardValue::from_parts(Suit::Hearts, Rank::Queen));
        assert_eq!(serde_json::to_string(&queen).unwrap(), "24");

        assert!(serde_json::from_str::<CardValue>("52").is_err());
        assert_eq!(CardValue::try_from(200u8), Err(InvalidCardValue(200)));
    }

    #[test]
    fn test_neighbours_stay_in_suit() {
        let king = CardValue::from_parts(Suit::Spades, Rank::King);
        let ace = CardValue::from_parts(Suit::Hearts, Rank::Ace);

        assert_eq!(king.next_higher(), None);
        assert_eq!(ace.next_lower(), None);
        assert_eq!(king.next_lower(), Some(CardValue::from_parts(Suit::Spades, Rank::Queen)));
        assert_eq!(ace.next_higher(), Some(CardValue::from_parts(Suit::Hearts, Rank::Two)));
    }

    #[test]
    fn test_rank_number() {
        assert_eq!(Rank::Ace.number(), 1);
        assert_eq!(Rank::Queen.number(), 12);
        assert_eq!(Rank::King.number(), 13);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CardValue::from_parts(Suit::Hearts, Rank::Queen)), "Q♥");
        assert_eq!(format!("{}", CardValue::from_parts(Suit::Clubs, Rank::Ten)), "10♣");
    }

    #[test]
    fn test_flags_bit_layout() {
        let flags = CardFlags::default()
            .with_highlight(5)
            .with_face_down(true)
            .with_spread(true);

        assert_eq!(flags.bits(), 0b0001_1101);
        assert_eq!(flags.highlight(), 5);
        assert!(flags.face_down());
        assert!(flags.spread());

        let cleared = flags.with_face_down(false).with_highlight(0);
        assert_eq!(cleared.bits(), 0b0001_0000);
    }

    #[test]
    fn test_flags_pass_bits() {
        let flags = CardFlags::from_bits(CardFlags::FACE_DOWN).with_pass(3);
        assert_eq!(flags.pass(), 3);
        assert!(flags.face_down());
        assert_eq!(flags.bits(), 0b0110_1000);
    }

    #[test]
    #[should_panic(expected = "Highlight code")]
    fn test_highlight_out_of_range() {
        let _ = CardFlags::default().with_highlight(8);
    }

    #[test]
    fn test_with_changes_keep_other_fields() {
        let card = Card::new(4, CardValue::new(7), 2, 3, CardFlags::default().with_spread(true));
        let moved = card.moved_to(5, 0).with_generation(9);

        assert_eq!(moved.value(), card.value());
        assert_eq!(moved.group(), 5);
        assert_eq!(moved.position(), 0);
        assert_eq!(moved.generation(), 9);
        assert!(moved.spread());
        // The original is untouched
        assert_eq!(card.group(), 2);
        assert_eq!(card.generation(), 4);
    }

    #[test]
    fn test_same_state_ignores_generation() {
        let card = Card::new(1, CardValue::new(10), 0, 0, CardFlags::default());
        assert!(card.same_state(&card.with_generation(8)));
        assert!(!card.same_state(&card.with_face_down(true)));
    }

    #[test]
    fn test_serialization() {
        let card = Card::new(3, CardValue::new(44), 28, 6, CardFlags::from_bits(0b1000));
        let json = serde_json::to_string(&card).unwrap();
        let deserialized: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(card, deserialized);
    }
}
