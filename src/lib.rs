//! # rust-solitaire
//!
//! Patience games on a generation-versioned card history.
//!
//! ## Design Principles
//!
//! 1. **History Is Append-Only**: Every move writes the cards it changed as
//!    a new generation. Undo and redo move a pointer; nothing is rewritten.
//!
//! 2. **One Move, One Generation**: Rule engines stage card changes inside
//!    `Dealer::with_undo`. A move either commits whole or leaves no trace.
//!
//! 3. **Rules Are Policy**: Variants only lay out a deck, interpret clicks
//!    and judge the table. Groups and positions mean nothing to the engine.
//!
//! ## Architecture
//!
//! - **Injected Store**: All persistence goes through the `CardStore`
//!   trait. `MemoryStore` keeps its tables in `im` maps for O(1)
//!   transaction savepoints.
//!
//! - **Compact Cards**: A card record is its identity, group, position and
//!   one flags byte (highlight, face down, spread, stock pass).
//!
//! ## Modules
//!
//! - `core`: Card records, RNG, options, errors
//! - `history`: Store contract, generation history, dealer, highlights
//! - `zones`: Group/position index over the live table
//! - `rules`: The `Solitaire` trait and `GameStatus`
//! - `games`: Scorpion and Pyramid
//! - `session`: Interaction loop over a dealer and a game

pub mod core;
pub mod games;
pub mod history;
pub mod rules;
pub mod session;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    Card, CardFlags, CardValue, Deck, GameError, GameKind, GameOptions, GameRng, HistoryConfig, PyramidOptions,
    Rank, Result, ScorpionOptions, Suit, DECK_SIZE,
};

pub use crate::history::{
    CardStore, ChangedCards, Dealer, DealerEvent, GameStateRow, GenerationStore, Highlight, HighlightSet,
    MemoryStore, Reconstruction, StoreError,
};

pub use crate::zones::{Layout, LayoutError};

pub use crate::rules::{GameStatus, Solitaire};

pub use crate::games::{Game, Pyramid, Scorpion};

pub use crate::session::Session;
