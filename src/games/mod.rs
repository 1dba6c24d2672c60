//! Solitaire variants.
//!
//! [`Game`] is the closed set of supported variants. It implements
//! [`Solitaire`] by delegating to the active one, so a session can switch
//! games without boxing.

pub mod pyramid;
pub mod scorpion;

pub use pyramid::Pyramid;
pub use scorpion::Scorpion;

use crate::core::{Card, CardValue, Deck, GameKind, GameOptions, Result, DECK_SIZE};
use crate::history::{CardStore, Dealer};
use crate::rules::{GameStatus, Solitaire};
use crate::zones::LayoutError;

/// The active variant.
#[derive(Clone, Debug)]
pub enum Game {
    Scorpion(Scorpion),
    Pyramid(Pyramid),
}

impl Game {
    /// Build the variant `options` belong to.
    #[must_use]
    pub fn new(options: GameOptions) -> Self {
        match options {
            GameOptions::Scorpion(options) => Game::Scorpion(Scorpion::new(options)),
            GameOptions::Pyramid(options) => Game::Pyramid(Pyramid::new(options)),
        }
    }

    /// Default-configured variant of `kind`.
    #[must_use]
    pub fn of_kind(kind: GameKind) -> Self {
        Self::new(GameOptions::default_for(kind))
    }

    /// Replace the options, keeping the variant.
    ///
    /// Panics if `options` belong to a different game.
    pub fn set_options(&mut self, options: GameOptions) {
        match (self, options) {
            (Game::Scorpion(game), GameOptions::Scorpion(options)) => game.set_options(options),
            (Game::Pyramid(game), GameOptions::Pyramid(options)) => game.set_options(options),
            (game, options) => panic!("Cannot apply {} options to {}", options.kind(), game.kind()),
        }
    }

    #[must_use]
    pub fn as_scorpion(&self) -> Option<&Scorpion> {
        match self {
            Game::Scorpion(game) => Some(game),
            Game::Pyramid(_) => None,
        }
    }

    pub fn as_scorpion_mut(&mut self) -> Option<&mut Scorpion> {
        match self {
            Game::Scorpion(game) => Some(game),
            Game::Pyramid(_) => None,
        }
    }

    #[must_use]
    pub fn as_pyramid(&self) -> Option<&Pyramid> {
        match self {
            Game::Pyramid(game) => Some(game),
            Game::Scorpion(_) => None,
        }
    }
}

impl Solitaire for Game {
    fn kind(&self) -> GameKind {
        match self {
            Game::Scorpion(game) => game.kind(),
            Game::Pyramid(game) => game.kind(),
        }
    }

    fn options(&self) -> GameOptions {
        match self {
            Game::Scorpion(game) => game.options(),
            Game::Pyramid(game) => game.options(),
        }
    }

    fn deal(&self, shuffled: &[CardValue; DECK_SIZE]) -> Vec<Card> {
        match self {
            Game::Scorpion(game) => game.deal(shuffled),
            Game::Pyramid(game) => game.deal(shuffled),
        }
    }

    fn is_clickable(&self, cards: &Deck, value: CardValue) -> bool {
        match self {
            Game::Scorpion(game) => game.is_clickable(cards, value),
            Game::Pyramid(game) => game.is_clickable(cards, value),
        }
    }

    fn on_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        match self {
            Game::Scorpion(game) => game.on_click(dealer, value),
            Game::Pyramid(game) => game.on_click(dealer, value),
        }
    }

    fn on_double_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        match self {
            Game::Scorpion(game) => game.on_double_click(dealer, value),
            Game::Pyramid(game) => game.on_double_click(dealer, value),
        }
    }

    fn check_game_over(&self, cards: &Deck) -> GameStatus {
        match self {
            Game::Scorpion(game) => game.check_game_over(cards),
            Game::Pyramid(game) => game.check_game_over(cards),
        }
    }

    fn is_valid(&self, cards: &Deck) -> Option<LayoutError> {
        match self {
            Game::Scorpion(game) => game.is_valid(cards),
            Game::Pyramid(game) => game.is_valid(cards),
        }
    }

    fn reset(&mut self) {
        match self {
            Game::Scorpion(game) => game.reset(),
            Game::Pyramid(game) => game.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PyramidOptions, ScorpionOptions};

    #[test]
    fn test_new_from_options() {
        let game = Game::new(GameOptions::Pyramid(PyramidOptions::default().with_stock_pass_count(1)));
        assert_eq!(game.kind(), GameKind::Pyramid);
        assert!(game.as_scorpion().is_none());
        assert_eq!(game.as_pyramid().map(|p| p.pyramid_options().stock_pass_count), Some(1));
    }

    #[test]
    fn test_set_options() {
        let mut game = Game::of_kind(GameKind::Scorpion);
        let options = ScorpionOptions::default().with_king_moves_alone(true);
        game.set_options(GameOptions::Scorpion(options));
        assert_eq!(game.options(), GameOptions::Scorpion(options));
    }

    #[test]
    #[should_panic(expected = "Cannot apply pyramid options to scorpion")]
    fn test_set_options_wrong_game() {
        let mut game = Game::of_kind(GameKind::Scorpion);
        game.set_options(GameOptions::default_for(GameKind::Pyramid));
    }
}
