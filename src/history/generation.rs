//! Append-only, generation-versioned card history.
//!
//! ## Model
//!
//! Generation 0 holds all 52 cards as dealt. Every later generation holds
//! only the cards that changed in it. The table at generation `g` is, for
//! each identity, its row with the greatest generation `<= g`.
//!
//! History is linear: committing generation `g` first deletes every row at
//! `g` or above, so an undone branch can never be resurrected.
//!
//! ```text
//! gen 0: A♠ B♠ C♠ ... (52 rows)
//! gen 1:    B♠'          <- undo_delta(1) = [B♠]   redo_delta(1) = [B♠']
//! gen 2: A♠'   C♠'       <- undo_delta(2) = [A♠, C♠]
//! ```

use tracing::debug;

use super::store::CardStore;
use crate::core::{Card, CardValue, Deck, GameError, Result, DECK_SIZE};

/// Result of rebuilding the table at one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconstruction {
    /// All 52 identities resolved.
    Complete(Box<Deck>),

    /// Some identities have no row at or below the generation, e.g. it lies
    /// under the compacted history floor. This is "no valid state", not an
    /// empty table.
    Incomplete { generation: u64, resolved: usize },
}

impl Reconstruction {
    /// The rebuilt table, if complete.
    #[must_use]
    pub fn into_deck(self) -> Option<Deck> {
        match self {
            Reconstruction::Complete(deck) => Some(*deck),
            Reconstruction::Incomplete { .. } => None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Reconstruction::Complete(_))
    }

    /// The rebuilt table, or [`GameError::IncompleteHistory`].
    pub fn require(self) -> Result<Deck> {
        match self {
            Reconstruction::Complete(deck) => Ok(*deck),
            Reconstruction::Incomplete { generation, resolved } => {
                Err(GameError::IncompleteHistory { generation, resolved })
            }
        }
    }
}

/// Arrange 52 distinct cards by identity.
///
/// Returns the number of distinct identities found if any is missing.
pub(crate) fn deck_from_cards(cards: &[Card]) -> std::result::Result<Deck, usize> {
    let mut slots: [Option<Card>; DECK_SIZE] = [None; DECK_SIZE];
    for card in cards {
        slots[card.value().index()] = Some(*card);
    }
    let resolved = slots.iter().filter(|slot| slot.is_some()).count();
    if resolved != DECK_SIZE || cards.len() != DECK_SIZE {
        return Err(resolved);
    }

    let mut deck = [Card::new(0, CardValue::new(0), 0, 0, Default::default()); DECK_SIZE];
    for (target, slot) in deck.iter_mut().zip(slots) {
        if let Some(card) = slot {
            *target = card;
        }
    }
    Ok(deck)
}

/// Versioned card history over an injected [`CardStore`].
#[derive(Debug)]
pub struct GenerationStore<S: CardStore> {
    store: S,
}

impl<S: CardStore> GenerationStore<S> {
    /// Wrap a store handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably. Used for game-state and highlight rows.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the store handle.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Rebuild the full table as of `generation`.
    pub fn all_cards_at(&self, generation: u64) -> Result<Reconstruction> {
        let rows = self
            .store
            .select_current_generation(generation)
            .map_err(GameError::store("select current generation"))?;

        match deck_from_cards(&rows) {
            Ok(deck) => Ok(Reconstruction::Complete(Box::new(deck))),
            Err(resolved) => {
                debug!(generation, resolved, "history does not resolve every card");
                Ok(Reconstruction::Incomplete { generation, resolved })
            }
        }
    }

    /// Write `changed` as generation `generation`, replacing any rows at or
    /// above it.
    ///
    /// Every card must already be tagged with `generation`; otherwise
    /// nothing is written. The redo-clear and the insert happen in one store
    /// transaction.
    pub fn commit(&mut self, changed: &[Card], generation: u64) -> Result<()> {
        if let Some(card) = changed.iter().find(|card| card.generation() != generation) {
            return Err(GameError::InconsistentGeneration {
                value: card.value(),
                expected: generation,
                found: card.generation(),
            });
        }

        self.store.begin().map_err(GameError::store("begin commit"))?;
        let written = self
            .store
            .delete_cards_where_generation_at_least(generation)
            .map_err(GameError::store("clear redo"))
            .and_then(|cleared| {
                self.store
                    .insert_cards(changed)
                    .map_err(GameError::store("insert cards"))
                    .map(|()| cleared)
            });

        self.finish(written, |cleared| {
            debug!(generation, cards = changed.len(), cleared, "committed generation");
        })
    }

    /// Replace the whole history with a freshly dealt generation 0 owned
    /// by `game`.
    ///
    /// The card table is shared by every game in the store, so the owner is
    /// written in the same store transaction as the rows.
    ///
    /// Panics if `deck` is not tagged generation 0.
    pub fn reset(&mut self, deck: &Deck, game: &str) -> Result<()> {
        assert!(
            deck.iter().all(|card| card.generation() == 0),
            "Dealt cards must be generation 0"
        );

        self.store.begin().map_err(GameError::store("begin deal"))?;
        let written = self
            .store
            .delete_cards_where_generation_at_least(0)
            .map_err(GameError::store("clear history"))
            .and_then(|cleared| {
                self.store
                    .insert_cards(deck)
                    .map_err(GameError::store("insert cards"))
                    .map(|()| cleared)
            })
            .and_then(|cleared| {
                self.store
                    .update_dealt_game(game)
                    .map_err(GameError::store("update dealt game"))
                    .map(|()| cleared)
            });

        self.finish(written, |cleared| {
            debug!(game, cleared, "replaced history with new deal");
        })
    }

    /// Game whose deal the card rows belong to.
    pub fn dealt_game(&self) -> Result<Option<String>> {
        self.store
            .read_dealt_game()
            .map_err(GameError::store("read dealt game"))
    }

    /// Commit the open store transaction, or roll it back if writing or
    /// committing failed.
    fn finish(&mut self, written: Result<usize>, on_commit: impl FnOnce(usize)) -> Result<()> {
        let outcome = written.and_then(|cleared| {
            self.store
                .commit()
                .map_err(GameError::store("commit"))
                .map(|()| cleared)
        });
        match outcome {
            Ok(cleared) => {
                on_commit(cleared);
                Ok(())
            }
            Err(err) => {
                self.store.rollback();
                Err(err)
            }
        }
    }

    /// Prior rows for every identity changed at `generation`.
    pub fn undo_delta(&self, generation: u64) -> Result<Vec<Card>> {
        self.store
            .select_undo_delta(generation)
            .map_err(GameError::store("select undo delta"))
    }

    /// Rows stored at exactly `generation`.
    pub fn redo_delta(&self, generation: u64) -> Result<Vec<Card>> {
        self.store
            .select_redo_delta(generation)
            .map_err(GameError::store("select redo delta"))
    }

    /// Lowest generation that still resolves all 52 cards.
    pub fn min_generation(&self) -> Result<Option<u64>> {
        self.store
            .select_min_generation()
            .map_err(GameError::store("select min generation"))
    }

    /// Highest committed generation.
    pub fn max_generation(&self) -> Result<Option<u64>> {
        self.store
            .select_max_generation()
            .map_err(GameError::store("select max generation"))
    }

    /// Delete every row at or above `generation`.
    pub fn clear_redo(&mut self, generation: u64) -> Result<usize> {
        let removed = self
            .store
            .delete_cards_where_generation_at_least(generation)
            .map_err(GameError::store("clear redo"))?;
        debug!(generation, removed, "cleared redo rows");
        Ok(removed)
    }

    /// Drop rows superseded at or below `generation`.
    ///
    /// Afterwards no generation below the latest kept row of each identity
    /// can be rebuilt, so [`min_generation`](Self::min_generation) rises.
    pub fn clear_undo(&mut self, generation: u64) -> Result<usize> {
        let removed = self
            .store
            .delete_cards_superseded_at_or_below(generation)
            .map_err(GameError::store("clear undo"))?;
        debug!(generation, removed, "compacted undo rows");
        Ok(removed)
    }
}
