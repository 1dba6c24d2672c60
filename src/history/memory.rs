//! In-memory [`CardStore`] on persistent maps.
//!
//! Tables are `im::OrdMap`s, so opening a store transaction is an O(1)
//! clone of the committed tables and rolling back is a swap. Card rows are
//! keyed by `(value, generation)`, which keeps every identity's history
//! contiguous and ordered for "latest row at or below" lookups.
//!
//! The committed tables can be saved with [`MemoryStore::to_bytes`] and
//! restored with [`MemoryStore::from_bytes`].

use im::OrdMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::store::{CardStore, GameStateRow, StoreError};
use crate::core::{Card, CardValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
struct RowKey {
    value: CardValue,
    generation: u64,
}

impl RowKey {
    const fn new(value: CardValue, generation: u64) -> Self {
        Self { value, generation }
    }

    fn of(card: &Card) -> Self {
        Self::new(card.value(), card.generation())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Tables {
    cards: OrdMap<RowKey, Card>,
    game_states: OrdMap<String, GameStateRow>,
    highlights: OrdMap<CardValue, u8>,
    dealt_game: Option<String>,
}

/// In-memory card store with O(1) savepoints.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    savepoint: Option<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of card rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.cards.len()
    }

    /// All card rows, by identity then generation.
    pub fn rows(&self) -> impl Iterator<Item = Card> + '_ {
        self.tables.cards.values().copied()
    }

    /// Check if a store transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.savepoint.is_some()
    }

    /// Encode the committed tables.
    ///
    /// Changes made inside an open transaction are not included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let committed = self.savepoint.as_ref().unwrap_or(&self.tables);
        Ok(bincode::serialize(committed)?)
    }

    /// Restore a store saved with [`MemoryStore::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(Self {
            tables: bincode::deserialize(bytes)?,
            savepoint: None,
        })
    }

    fn identity_rows(&self, value: CardValue, upto: u64) -> impl DoubleEndedIterator<Item = (&RowKey, &Card)> + '_ {
        self.tables
            .cards
            .range(RowKey::new(value, 0)..=RowKey::new(value, upto))
    }

    fn latest_at_or_below(&self, value: CardValue, generation: u64) -> Option<Card> {
        self.identity_rows(value, generation)
            .next_back()
            .map(|(_, card)| *card)
    }
}

impl CardStore for MemoryStore {
    fn insert_cards(&mut self, rows: &[Card]) -> Result<(), StoreError> {
        let mut batch = FxHashSet::default();
        for card in rows {
            let key = RowKey::of(card);
            if self.tables.cards.contains_key(&key) || !batch.insert(key) {
                return Err(StoreError::DuplicateRow {
                    value: card.value(),
                    generation: card.generation(),
                });
            }
        }
        for card in rows {
            self.tables.cards.insert(RowKey::of(card), *card);
        }
        Ok(())
    }

    fn delete_cards_where_generation_at_least(&mut self, generation: u64) -> Result<usize, StoreError> {
        let doomed: Vec<RowKey> = self
            .tables
            .cards
            .keys()
            .filter(|key| key.generation >= generation)
            .copied()
            .collect();
        for key in &doomed {
            self.tables.cards.remove(key);
        }
        Ok(doomed.len())
    }

    fn delete_cards_superseded_at_or_below(&mut self, generation: u64) -> Result<usize, StoreError> {
        let mut doomed = Vec::new();
        for value in CardValue::all() {
            let keys: Vec<RowKey> = self.identity_rows(value, generation).map(|(key, _)| *key).collect();
            // Keep the latest row; everything older is unreachable
            if let Some((_, older)) = keys.split_last() {
                doomed.extend_from_slice(older);
            }
        }
        for key in &doomed {
            self.tables.cards.remove(key);
        }
        Ok(doomed.len())
    }

    fn select_current_generation(&self, generation: u64) -> Result<Vec<Card>, StoreError> {
        Ok(CardValue::all()
            .filter_map(|value| self.latest_at_or_below(value, generation))
            .collect())
    }

    fn select_undo_delta(&self, generation: u64) -> Result<Vec<Card>, StoreError> {
        let Some(below) = generation.checked_sub(1) else {
            return Ok(Vec::new());
        };
        Ok(CardValue::all()
            .filter(|&value| self.tables.cards.contains_key(&RowKey::new(value, generation)))
            .filter_map(|value| self.latest_at_or_below(value, below))
            .collect())
    }

    fn select_redo_delta(&self, generation: u64) -> Result<Vec<Card>, StoreError> {
        Ok(CardValue::all()
            .filter_map(|value| self.tables.cards.get(&RowKey::new(value, generation)).copied())
            .collect())
    }

    fn select_min_generation(&self) -> Result<Option<u64>, StoreError> {
        let mut floor = 0;
        for value in CardValue::all() {
            match self.identity_rows(value, u64::MAX).next() {
                Some((key, _)) => floor = floor.max(key.generation),
                None => return Ok(None),
            }
        }
        Ok(Some(floor))
    }

    fn select_max_generation(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.tables.cards.keys().map(|key| key.generation).max())
    }

    fn update_game_state_pointer(&mut self, game: &str, generation: u64, undone: bool) -> Result<(), StoreError> {
        let mut row = self.tables.game_states.get(game).cloned().unwrap_or_default();
        row.generation = generation;
        row.undone = undone;
        self.tables.game_states.insert(game.to_string(), row);
        Ok(())
    }

    fn write_game_options(&mut self, game: &str, options: &[u8]) -> Result<(), StoreError> {
        let mut row = self.tables.game_states.get(game).cloned().unwrap_or_default();
        row.options = options.to_vec();
        self.tables.game_states.insert(game.to_string(), row);
        Ok(())
    }

    fn read_game_state(&self, game: &str) -> Result<Option<GameStateRow>, StoreError> {
        Ok(self.tables.game_states.get(game).cloned())
    }

    fn update_dealt_game(&mut self, game: &str) -> Result<(), StoreError> {
        self.tables.dealt_game = Some(game.to_string());
        Ok(())
    }

    fn read_dealt_game(&self) -> Result<Option<String>, StoreError> {
        Ok(self.tables.dealt_game.clone())
    }

    fn upsert_highlights(&mut self, pairs: &[(CardValue, u8)]) -> Result<(), StoreError> {
        for &(value, code) in pairs {
            self.tables.highlights.insert(value, code);
        }
        Ok(())
    }

    fn delete_highlights(&mut self, values: &[CardValue]) -> Result<(), StoreError> {
        for value in values {
            self.tables.highlights.remove(value);
        }
        Ok(())
    }

    fn read_all_highlights(&self) -> Result<Vec<(CardValue, u8)>, StoreError> {
        Ok(self
            .tables
            .highlights
            .iter()
            .map(|(value, code)| (*value, *code))
            .collect())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.savepoint.is_some() {
            return Err(StoreError::TransactionOpen);
        }
        self.savepoint = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.savepoint.take().map(|_| ()).ok_or(StoreError::NoTransaction)
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.savepoint.take() {
            self.tables = saved;
        }
    }
}
