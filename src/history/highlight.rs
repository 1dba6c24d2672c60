//! Transient highlight overlay.
//!
//! Highlights give selection and match feedback. They live outside the
//! generation history: undo never restores them, and games clear and
//! recompute them on each interaction.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::CardValue;

/// Highlight code, stored in 3 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Highlight {
    #[default]
    None = 0,
    /// The card the player picked.
    Selected = 1,
    /// A card a second click can act on.
    Target = 2,
    /// Informational only.
    Hint = 3,
    /// A card that pairs with the selection.
    Match = 4,
}

impl Highlight {
    /// Decode a stored code. Unknown codes read as `None`.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Highlight::Selected,
            2 => Highlight::Target,
            3 => Highlight::Hint,
            4 => Highlight::Match,
            _ => Highlight::None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Card -> highlight overlay.
#[derive(Clone, Debug, Default)]
pub struct HighlightSet {
    codes: FxHashMap<CardValue, Highlight>,
}

impl HighlightSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight of a card (`None` when unset).
    #[must_use]
    pub fn get(&self, value: CardValue) -> Highlight {
        self.codes.get(&value).copied().unwrap_or_default()
    }

    /// Set a highlight; `Highlight::None` removes the entry.
    pub fn set(&mut self, value: CardValue, highlight: Highlight) {
        if highlight == Highlight::None {
            self.codes.remove(&value);
        } else {
            self.codes.insert(value, highlight);
        }
    }

    /// Remove every highlight, returning the cards that had one.
    pub fn clear(&mut self) -> Vec<CardValue> {
        let mut cleared: Vec<CardValue> = self.codes.drain().map(|(value, _)| value).collect();
        cleared.sort();
        cleared
    }

    /// Every highlighted card, in identity order.
    #[must_use]
    pub fn cards(&self) -> Vec<CardValue> {
        let mut values: Vec<CardValue> = self.codes.keys().copied().collect();
        values.sort();
        values
    }

    /// Cards carrying `highlight`, in identity order.
    #[must_use]
    pub fn with(&self, highlight: Highlight) -> Vec<CardValue> {
        let mut values: Vec<CardValue> = self
            .codes
            .iter()
            .filter(|(_, &h)| h == highlight)
            .map(|(&value, _)| value)
            .collect();
        values.sort();
        values
    }

    /// First card carrying `highlight`, in identity order.
    #[must_use]
    pub fn first(&self, highlight: Highlight) -> Option<CardValue> {
        self.with(highlight).into_iter().next()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }
}
