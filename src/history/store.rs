//! Persistent store contract.
//!
//! The engine never talks to a database directly. A [`CardStore`] is the
//! relational collaborator holding three tables:
//!
//! - **cards**: one row per `(value, generation)`, never updated in place
//! - **game states**: per game name, the generation pointer, the undone
//!   marker and an opaque options blob
//! - **highlights**: a card -> highlight code overlay outside the history
//!
//! Calls are blocking. A store handle is passed explicitly to the
//! [`GenerationStore`](super::GenerationStore) that owns it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Card, CardValue};

/// Store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A card row with this identity and generation already exists.
    #[error("duplicate row for card {value} at generation {generation}")]
    DuplicateRow { value: CardValue, generation: u64 },

    /// `begin` was called while a store transaction was open.
    #[error("a store transaction is already open")]
    TransactionOpen,

    /// `commit` was called without an open store transaction.
    #[error("no open store transaction")]
    NoTransaction,

    /// The backing storage could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Snapshot encoding or decoding failed.
    #[error("snapshot encoding failed")]
    Snapshot(#[from] bincode::Error),
}

/// Saved state of one game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateRow {
    /// Generation the live table was at.
    pub generation: u64,

    /// The pointer was moved back by undo and rows above it are redoable.
    pub undone: bool,

    /// Encoded game options.
    pub options: Vec<u8>,
}

/// Operations the engine consumes from the persistent store.
///
/// Row selections return cards ordered by identity ascending.
pub trait CardStore {
    // === Card history ===

    /// Insert rows. Fails without inserting anything on a duplicate key.
    fn insert_cards(&mut self, rows: &[Card]) -> Result<(), StoreError>;

    /// Delete every row with `generation >= generation`.
    fn delete_cards_where_generation_at_least(&mut self, generation: u64) -> Result<usize, StoreError>;

    /// Per identity, delete rows older than its latest row at or below
    /// `generation`.
    fn delete_cards_superseded_at_or_below(&mut self, generation: u64) -> Result<usize, StoreError>;

    /// Per identity, the row with the greatest generation `<= generation`.
    fn select_current_generation(&self, generation: u64) -> Result<Vec<Card>, StoreError>;

    /// Per identity with a row at exactly `generation`, its row at the
    /// greatest generation below it.
    fn select_undo_delta(&self, generation: u64) -> Result<Vec<Card>, StoreError>;

    /// Rows stored at exactly `generation`.
    fn select_redo_delta(&self, generation: u64) -> Result<Vec<Card>, StoreError>;

    /// Lowest generation every identity resolves at.
    fn select_min_generation(&self) -> Result<Option<u64>, StoreError>;

    /// Highest stored generation.
    fn select_max_generation(&self) -> Result<Option<u64>, StoreError>;

    // === Game state ===

    fn update_game_state_pointer(&mut self, game: &str, generation: u64, undone: bool) -> Result<(), StoreError>;

    fn write_game_options(&mut self, game: &str, options: &[u8]) -> Result<(), StoreError>;

    fn read_game_state(&self, game: &str) -> Result<Option<GameStateRow>, StoreError>;

    /// Record which game the card rows were dealt for. Every game shares
    /// the one card table.
    fn update_dealt_game(&mut self, game: &str) -> Result<(), StoreError>;

    fn read_dealt_game(&self) -> Result<Option<String>, StoreError>;

    // === Highlight overlay ===

    fn upsert_highlights(&mut self, pairs: &[(CardValue, u8)]) -> Result<(), StoreError>;

    fn delete_highlights(&mut self, values: &[CardValue]) -> Result<(), StoreError>;

    fn read_all_highlights(&self) -> Result<Vec<(CardValue, u8)>, StoreError>;

    // === Transactions ===

    /// Open a store transaction.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Make everything since `begin` durable.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard everything since `begin`. A no-op without a transaction.
    fn rollback(&mut self);
}
