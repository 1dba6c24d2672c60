//! The contract every solitaire variant implements.
//!
//! A rule engine is pure policy. It lays out a shuffled deck, decides what
//! a click means, and judges whether the game is over. All card changes go
//! through the [`Dealer`] inside [`Dealer::with_undo`], so each interaction
//! becomes at most one undoable generation.

use serde::{Deserialize, Serialize};

use crate::core::{Card, CardValue, Deck, GameKind, GameOptions, Result, DECK_SIZE};
use crate::history::{CardStore, Dealer};
use crate::zones::LayoutError;

/// Outcome of a game so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Moves remain.
    #[default]
    Continue,
    /// Solved. `cheats` counts the one-shot cheats used on the way.
    Won { cheats: u32 },
    /// No legal move is left.
    Lost,
}

impl GameStatus {
    /// Check if the game has ended either way.
    #[must_use]
    pub fn is_over(self) -> bool {
        !matches!(self, GameStatus::Continue)
    }

    #[must_use]
    pub fn is_won(self) -> bool {
        matches!(self, GameStatus::Won { .. })
    }
}

/// Rules of one solitaire variant.
///
/// ## Implementation Notes
///
/// - `deal`: Return all 52 cards tagged generation 0
/// - `on_click`/`on_double_click`: Return `true` when a generation was
///   committed; selection changes alone return `false`
/// - `check_game_over`: Must not depend on highlights
pub trait Solitaire {
    fn kind(&self) -> GameKind;

    /// Current options.
    fn options(&self) -> GameOptions;

    /// Lay out a shuffled deck.
    fn deal(&self, shuffled: &[CardValue; DECK_SIZE]) -> Vec<Card>;

    /// Check if clicking `value` can do anything.
    fn is_clickable(&self, cards: &Deck, value: CardValue) -> bool;

    fn on_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool>;

    fn on_double_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool>;

    /// Judge the table.
    fn check_game_over(&self, cards: &Deck) -> GameStatus;

    /// First broken layout invariant, if any.
    fn is_valid(&self, cards: &Deck) -> Option<LayoutError>;

    /// Forget per-game state before a fresh deal.
    fn reset(&mut self) {}
}

/// Run `action` as one undoable step and report whether it committed.
pub(crate) fn commit_step<S, F>(dealer: &mut Dealer<S>, action: F) -> Result<bool>
where
    S: CardStore,
    F: FnOnce(&mut Dealer<S>) -> Result<()>,
{
    let before = dealer.generation();
    dealer.with_undo(action)?;
    Ok(dealer.generation() != before)
}
