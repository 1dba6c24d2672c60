//! Core engine types: card records, RNG, configuration, errors.
//!
//! These are shared by the history layer and every game variant.

pub mod card;
pub mod config;
pub mod error;
pub mod rng;

pub use card::{Card, CardFlags, CardValue, Deck, InvalidCardValue, Rank, Suit, DECK_SIZE, RANK_COUNT};
pub use config::{GameKind, GameOptions, HistoryConfig, PyramidOptions, ScorpionOptions};
pub use error::{GameError, Result};
pub use rng::GameRng;
