//! Generation history and the dealer.
//!
//! ## Key Types
//!
//! - [`CardStore`]: The persistence contract (cards, game states, highlights)
//! - [`MemoryStore`]: In-memory store on persistent maps
//! - [`GenerationStore`]: Versioned history over a store
//! - [`Dealer`]: Live table, undoable transactions, undo/redo
//! - [`HighlightSet`]: Non-undoable selection overlay
//! - [`DealerEvent`]: Change notifications for a renderer

pub mod dealer;
pub mod event;
pub mod generation;
pub mod highlight;
pub mod memory;
pub mod store;

pub use dealer::Dealer;
pub use event::{ChangedCards, DealerEvent};
pub use generation::{GenerationStore, Reconstruction};
pub use highlight::{Highlight, HighlightSet};
pub use memory::MemoryStore;
pub use store::{CardStore, GameStateRow, StoreError};
