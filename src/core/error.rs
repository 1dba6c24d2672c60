//! Engine error types.
//!
//! Persistence failures and inconsistent history are reported as
//! [`GameError`]. Caller bugs that can never be a runtime condition (an
//! out-of-range card value, staging a card outside a transaction, moving a
//! column onto itself) panic instead.

use thiserror::Error;

use super::card::CardValue;
use crate::history::StoreError;

/// Engine error.
#[derive(Debug, Error)]
pub enum GameError {
    /// A committed card is tagged with the wrong generation.
    #[error("card {value} is tagged generation {found}, commit targets generation {expected}")]
    InconsistentGeneration {
        value: CardValue,
        expected: u64,
        found: u64,
    },

    /// The history cannot reconstruct all 52 cards at a generation.
    #[error("history at generation {generation} resolves only {resolved} of 52 cards")]
    IncompleteHistory { generation: u64, resolved: usize },

    /// A transaction is already open on this dealer.
    #[error("a transaction targeting generation {generation} is already open")]
    NestedTransaction { generation: u64 },

    /// The card store failed.
    #[error("card store failed during {operation}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// A saved options blob could not be decoded.
    #[error("invalid saved options for {game}")]
    Options {
        game: &'static str,
        #[source]
        source: bincode::Error,
    },

    /// An action gave up part way through.
    #[error("action aborted: {0}")]
    Aborted(String),
}

impl GameError {
    /// Wrap a store error raised by `operation`.
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> GameError {
        move |source| GameError::Store { operation, source }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, GameError>;
