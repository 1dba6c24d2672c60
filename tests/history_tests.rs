//! Generation history and dealer integration tests.

use std::panic::{catch_unwind, AssertUnwindSafe};

use proptest::prelude::*;

use rust_solitaire::core::{Card, CardFlags, CardValue, Deck, GameError, GameKind, HistoryConfig, DECK_SIZE};
use rust_solitaire::history::{CardStore, Dealer, DealerEvent, GameStateRow, MemoryStore, StoreError};

fn layout() -> Vec<Card> {
    CardValue::all()
        .map(|value| Card::new(0, value, 0, u16::from(value.raw()), CardFlags::default()))
        .collect()
}

fn dealer<S: CardStore>(store: S) -> Dealer<S> {
    let mut dealer = Dealer::new(store, GameKind::Scorpion, HistoryConfig::default());
    dealer.deal_cards(layout()).unwrap();
    dealer
}

fn move_card<S: CardStore>(dealer: &mut Dealer<S>, value: u8, group: u16) -> Result<(), GameError> {
    dealer.with_undo(|d| {
        d.change_card(CardValue::new(value), |c| c.with_group(group));
        Ok(())
    })
}

/// A store whose inserts or commits can be made to fail.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_inserts: bool,
    fail_commits: bool,
}

impl CardStore for FlakyStore {
    fn insert_cards(&mut self, rows: &[Card]) -> Result<(), StoreError> {
        if self.fail_inserts {
            return Err(StoreError::Unavailable("disk full".into()));
        }
        self.inner.insert_cards(rows)
    }

    fn delete_cards_where_generation_at_least(&mut self, generation: u64) -> Result<usize, StoreError> {
        self.inner.delete_cards_where_generation_at_least(generation)
    }

    fn delete_cards_superseded_at_or_below(&mut self, generation: u64) -> Result<usize, StoreError> {
        self.inner.delete_cards_superseded_at_or_below(generation)
    }

    fn select_current_generation(&self, generation: u64) -> Result<Vec<Card>, StoreError> {
        self.inner.select_current_generation(generation)
    }

    fn select_undo_delta(&self, generation: u64) -> Result<Vec<Card>, StoreError> {
        self.inner.select_undo_delta(generation)
    }

    fn select_redo_delta(&self, generation: u64) -> Result<Vec<Card>, StoreError> {
        self.inner.select_redo_delta(generation)
    }

    fn select_min_generation(&self) -> Result<Option<u64>, StoreError> {
        self.inner.select_min_generation()
    }

    fn select_max_generation(&self) -> Result<Option<u64>, StoreError> {
        self.inner.select_max_generation()
    }

    fn update_game_state_pointer(&mut self, game: &str, generation: u64, undone: bool) -> Result<(), StoreError> {
        self.inner.update_game_state_pointer(game, generation, undone)
    }

    fn write_game_options(&mut self, game: &str, options: &[u8]) -> Result<(), StoreError> {
        self.inner.write_game_options(game, options)
    }

    fn read_game_state(&self, game: &str) -> Result<Option<GameStateRow>, StoreError> {
        self.inner.read_game_state(game)
    }

    fn update_dealt_game(&mut self, game: &str) -> Result<(), StoreError> {
        self.inner.update_dealt_game(game)
    }

    fn read_dealt_game(&self) -> Result<Option<String>, StoreError> {
        self.inner.read_dealt_game()
    }

    fn upsert_highlights(&mut self, pairs: &[(CardValue, u8)]) -> Result<(), StoreError> {
        self.inner.upsert_highlights(pairs)
    }

    fn delete_highlights(&mut self, values: &[CardValue]) -> Result<(), StoreError> {
        self.inner.delete_highlights(values)
    }

    fn read_all_highlights(&self) -> Result<Vec<(CardValue, u8)>, StoreError> {
        self.inner.read_all_highlights()
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.fail_commits {
            return Err(StoreError::Unavailable("commit refused".into()));
        }
        self.inner.commit()
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}

// =============================================================================
// Atomic Commit Tests
// =============================================================================

#[test]
fn test_failed_insert_writes_nothing() {
    let mut dealer = dealer(FlakyStore::default());
    move_card(&mut dealer, 5, 2).unwrap();
    let before = *dealer.cards();
    dealer.store_mut().fail_inserts = true;

    let err = move_card(&mut dealer, 6, 3).unwrap_err();

    assert!(matches!(err, GameError::Store { operation: "insert cards", .. }));
    assert_eq!(dealer.generation(), 1);
    assert_eq!(dealer.cards(), &before);
    assert_eq!(dealer.history().max_generation().unwrap(), Some(1));
    assert_eq!(dealer.store().inner.row_count(), DECK_SIZE + 1);
    assert!(!dealer.store().inner.in_transaction());
}

#[test]
fn test_failed_insert_keeps_redo_rows() {
    let mut dealer = dealer(FlakyStore::default());
    move_card(&mut dealer, 5, 2).unwrap();
    move_card(&mut dealer, 5, 4).unwrap();
    dealer.undo().unwrap();
    dealer.store_mut().fail_inserts = true;

    // The redo-clear ran inside the failed store transaction
    assert!(move_card(&mut dealer, 9, 1).is_err());

    assert!(dealer.can_redo().unwrap());
    dealer.store_mut().fail_inserts = false;
    assert_eq!(dealer.redo().unwrap(), Some(2));
    assert_eq!(dealer.find_card(CardValue::new(5)).group(), 4);
}

#[test]
fn test_failed_store_commit_rolls_back() {
    let mut dealer = dealer(FlakyStore::default());
    move_card(&mut dealer, 5, 2).unwrap();
    let before = *dealer.cards();
    dealer.store_mut().fail_commits = true;

    let err = move_card(&mut dealer, 6, 3).unwrap_err();

    assert!(matches!(err, GameError::Store { operation: "commit", .. }));
    assert_eq!(dealer.generation(), 1);
    assert_eq!(dealer.cards(), &before);
    assert_eq!(dealer.history().max_generation().unwrap(), Some(1));
    assert!(!dealer.store().inner.in_transaction());

    // The store is usable again once commits go through
    dealer.store_mut().fail_commits = false;
    move_card(&mut dealer, 6, 3).unwrap();
    assert_eq!(dealer.generation(), 2);
    assert_eq!(dealer.find_card(CardValue::new(6)).group(), 3);
}

#[test]
fn test_failed_deal_commit_keeps_old_game() {
    let mut dealer = dealer(FlakyStore::default());
    move_card(&mut dealer, 5, 2).unwrap();
    dealer.store_mut().fail_commits = true;

    assert!(dealer.deal_cards(layout()).is_err());

    assert!(!dealer.store().inner.in_transaction());
    assert_eq!(dealer.history().max_generation().unwrap(), Some(1));
}

#[test]
fn test_rollback_event_after_store_failure() {
    let mut dealer = dealer(FlakyStore::default());
    dealer.drain_events();
    dealer.store_mut().fail_inserts = true;

    let _ = move_card(&mut dealer, 1, 1);

    assert_eq!(dealer.drain_events(), vec![DealerEvent::RolledBack { generation: 0 }]);
}

#[test]
fn test_recover_after_panicking_action() {
    let mut dealer = dealer(MemoryStore::new());
    move_card(&mut dealer, 5, 2).unwrap();
    let before = *dealer.cards();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = dealer.with_undo(|d| -> Result<(), GameError> {
            d.change_card(CardValue::new(8), |c| c.with_group(4));
            panic!("action failed");
        });
    }));
    assert!(outcome.is_err());
    assert!(dealer.is_in_transaction());
    assert!(matches!(
        move_card(&mut dealer, 9, 1),
        Err(GameError::NestedTransaction { .. })
    ));

    dealer.recover().unwrap();

    assert!(!dealer.is_in_transaction());
    assert_eq!(dealer.cards(), &before);
    move_card(&mut dealer, 9, 1).unwrap();
    assert_eq!(dealer.generation(), 2);
}

// =============================================================================
// Redo Clearing Tests
// =============================================================================

#[test]
fn test_new_branch_never_resurrects_rows() {
    let mut dealer = dealer(MemoryStore::new());
    move_card(&mut dealer, 1, 1).unwrap();
    move_card(&mut dealer, 2, 2).unwrap();
    move_card(&mut dealer, 3, 3).unwrap();
    dealer.undo().unwrap();
    dealer.undo().unwrap();

    move_card(&mut dealer, 40, 6).unwrap();

    assert_eq!(dealer.history().max_generation().unwrap(), Some(2));
    let latest = dealer.history().all_cards_at(u64::MAX).unwrap().into_deck().unwrap();
    assert_eq!(latest[2].group(), 0);
    assert_eq!(latest[3].group(), 0);
    assert_eq!(latest[40].group(), 6);
    assert_eq!(dealer.redo().unwrap(), None);
}

#[test]
fn test_clear_redo_then_commit() {
    let mut dealer = dealer(MemoryStore::new());
    move_card(&mut dealer, 1, 1).unwrap();
    move_card(&mut dealer, 2, 2).unwrap();
    dealer.undo().unwrap();

    // Cleared explicitly, then the next commit reuses generation 2
    let mut history = rust_solitaire::GenerationStore::new(dealer.into_store());
    assert_eq!(history.clear_redo(2).unwrap(), 1);
    let replacement = layout()[7].with_group(5).with_generation(2);
    history.commit(&[replacement], 2).unwrap();

    let at_two = history.all_cards_at(2).unwrap().into_deck().unwrap();
    assert_eq!(at_two[2].group(), 0);
    assert_eq!(at_two[7], replacement);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_snapshot_resume() {
    let mut dealer = dealer(MemoryStore::new());
    move_card(&mut dealer, 11, 3).unwrap();
    move_card(&mut dealer, 12, 3).unwrap();
    dealer.undo().unwrap();
    let expected = *dealer.cards();

    let bytes = dealer.into_store().to_bytes().unwrap();
    let store = MemoryStore::from_bytes(&bytes).unwrap();
    let mut resumed = Dealer::new(store, GameKind::Scorpion, HistoryConfig::default());

    assert_eq!(resumed.resume().unwrap(), Some(1));
    assert_eq!(resumed.cards(), &expected);
    assert!(resumed.is_undone());
    assert_eq!(resumed.redo().unwrap(), Some(2));
}

#[test]
fn test_games_keep_separate_pointers() {
    let mut scorpion = dealer(MemoryStore::new());
    move_card(&mut scorpion, 1, 1).unwrap();
    let store = scorpion.into_store();

    let mut pyramid = Dealer::new(store, GameKind::Pyramid, HistoryConfig::default());
    assert_eq!(pyramid.resume().unwrap(), None);
    assert_eq!(
        pyramid.store().read_game_state("scorpion").unwrap().map(|s| s.generation),
        Some(1)
    );
}

#[test]
fn test_resume_refuses_rows_dealt_for_another_game() {
    let mut scorpion = dealer(MemoryStore::new());
    move_card(&mut scorpion, 1, 1).unwrap();

    let mut pyramid = Dealer::new(scorpion.into_store(), GameKind::Pyramid, HistoryConfig::default());
    pyramid.deal_cards(layout()).unwrap();
    assert_eq!(pyramid.history().dealt_game().unwrap().as_deref(), Some("pyramid"));

    // The scorpion pointer survives but its rows are gone
    let mut scorpion = Dealer::new(pyramid.into_store(), GameKind::Scorpion, HistoryConfig::default());
    assert!(scorpion.store().read_game_state("scorpion").unwrap().is_some());
    assert_eq!(scorpion.resume().unwrap(), None);
    assert_eq!(scorpion.drain_events(), vec![]);

    let mut pyramid = Dealer::new(scorpion.into_store(), GameKind::Pyramid, HistoryConfig::default());
    assert_eq!(pyramid.resume().unwrap(), Some(0));
}

// =============================================================================
// Undo Round Trip Properties
// =============================================================================

fn moves_strategy() -> impl Strategy<Value = Vec<Vec<(u8, u16)>>> {
    let change = (0u8..DECK_SIZE as u8, 0u16..8);
    prop::collection::vec(prop::collection::vec(change, 1..4), 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn undo_restores_every_generation(moves in moves_strategy()) {
        let mut dealer = dealer(MemoryStore::new());
        let mut tables: Vec<Deck> = vec![*dealer.cards()];

        for step in &moves {
            dealer.with_undo(|d| {
                for &(value, group) in step {
                    d.change_card(CardValue::new(value), |c| c.with_group(group));
                }
                Ok(())
            }).unwrap();
            if dealer.generation() as usize == tables.len() {
                tables.push(*dealer.cards());
            }
        }

        let top = dealer.generation();
        prop_assert_eq!(top as usize, tables.len() - 1);

        for generation in (0..top).rev() {
            prop_assert_eq!(dealer.undo().unwrap(), Some(generation));
            prop_assert_eq!(dealer.cards(), &tables[generation as usize]);
        }
        prop_assert_eq!(dealer.undo().unwrap(), None);

        for generation in 1..=top {
            prop_assert_eq!(dealer.redo().unwrap(), Some(generation));
            prop_assert_eq!(dealer.cards(), &tables[generation as usize]);
        }
        prop_assert_eq!(dealer.redo().unwrap(), None);
    }

    #[test]
    fn reconstruction_matches_live_table(moves in moves_strategy()) {
        let mut dealer = dealer(MemoryStore::new());
        for step in &moves {
            dealer.with_undo(|d| {
                for &(value, group) in step {
                    d.change_card(CardValue::new(value), |c| c.with_group(group));
                }
                Ok(())
            }).unwrap();
        }

        let rebuilt = dealer.history().all_cards_at(dealer.generation()).unwrap().into_deck().unwrap();
        prop_assert_eq!(&rebuilt, dealer.cards());
    }
}
