//! The dealer: live table, transactions and undo/redo.
//!
//! A [`Dealer`] keeps the live 52-card array in step with the generation
//! history. Rule engines never write to the store themselves; they change
//! cards through [`Dealer::card_changed`] inside [`Dealer::with_undo`], and
//! the dealer turns each successful action into exactly one generation.
//!
//! ## Transactions
//!
//! ```text
//! with_undo(action)
//!   ├─ action stages card changes against generation + 1
//!   ├─ Ok, nothing staged  -> no generation, nothing written
//!   ├─ Ok, staged          -> commit one generation, move the pointer
//!   └─ Err                 -> nothing written, live table reloaded
//! ```
//!
//! Highlights are a separate overlay. They are written straight through to
//! the store and are never part of a generation.

use std::mem;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::event::{ChangedCards, DealerEvent};
use super::generation::{deck_from_cards, GenerationStore};
use super::highlight::{Highlight, HighlightSet};
use super::store::CardStore;
use crate::core::{
    Card, CardFlags, CardValue, Deck, GameError, GameKind, GameRng, HistoryConfig, Result, DECK_SIZE,
};
use crate::rules::Solitaire;

/// Card changes staged by an open transaction.
#[derive(Debug)]
struct Transaction {
    target: u64,
    /// `(before, after)` per touched identity. `before` is the card as it
    /// was when the transaction opened.
    staged: SmallVec<[(Card, Card); 8]>,
}

impl Transaction {
    fn new(target: u64) -> Self {
        Self {
            target,
            staged: SmallVec::new(),
        }
    }

    /// Record `after` and return what the live slot should now hold.
    fn stage(&mut self, current: Card, after: Card) -> Card {
        match self.staged.iter().position(|(_, staged)| staged.value() == after.value()) {
            Some(index) => {
                let original = self.staged[index].0;
                if original.same_state(&after) {
                    // Changed back: nothing to write for this card
                    self.staged.remove(index);
                    original
                } else {
                    self.staged[index].1 = after;
                    after
                }
            }
            None if current.same_state(&after) => current,
            None => {
                self.staged.push((current, after));
                after
            }
        }
    }

    fn changed(&self) -> Vec<Card> {
        self.staged.iter().map(|(_, after)| *after).collect()
    }

    fn values(&self) -> ChangedCards {
        self.staged.iter().map(|(_, after)| after.value()).collect()
    }
}

/// Owns the history, the live table and the highlight overlay of one game.
#[derive(Debug)]
pub struct Dealer<S: CardStore> {
    history: GenerationStore<S>,
    game: GameKind,
    config: HistoryConfig,
    cards: Deck,
    generation: u64,
    undone: bool,
    transaction: Option<Transaction>,
    highlights: HighlightSet,
    events: Vec<DealerEvent>,
}

impl<S: CardStore> Dealer<S> {
    /// Create a dealer over `store` for `game`.
    ///
    /// The live table is a placeholder until [`deal`](Self::deal) or
    /// [`resume`](Self::resume) runs.
    pub fn new(store: S, game: GameKind, config: HistoryConfig) -> Self {
        let face_down = CardFlags::default().with_face_down(true);
        let cards: Deck = std::array::from_fn(|index| {
            let value = CardValue::new(index as u8);
            Card::new(0, value, 0, index as u16, face_down)
        });

        Self {
            history: GenerationStore::new(store),
            game,
            config,
            cards,
            generation: 0,
            undone: false,
            transaction: None,
            highlights: HighlightSet::new(),
            events: Vec::new(),
        }
    }

    // === Dealing ===

    /// Shuffle and deal a new game, discarding all prior history.
    pub fn deal<R: Solitaire + ?Sized>(&mut self, rules: &R, rng: &mut GameRng) -> Result<u64> {
        let shuffled = rng.shuffled_deck();
        self.deal_cards(rules.deal(&shuffled))
    }

    /// Install `cards` as generation 0, discarding all prior history.
    ///
    /// Panics unless `cards` holds all 52 identities once, tagged
    /// generation 0.
    pub fn deal_cards(&mut self, cards: Vec<Card>) -> Result<u64> {
        self.ensure_idle()?;
        let deck = match deck_from_cards(&cards) {
            Ok(deck) => deck,
            Err(resolved) => panic!("Dealt layout holds {} distinct cards, expected {}", resolved, DECK_SIZE),
        };

        self.history.reset(&deck, self.game.name())?;
        self.cards = deck;
        self.generation = 0;
        self.undone = false;
        self.write_pointer()?;
        self.clear_highlights()?;
        self.events.push(DealerEvent::Dealt { generation: 0 });
        info!(game = %self.game, "dealt new game");
        Ok(0)
    }

    /// Reload the live table, pointer and highlights from the store.
    ///
    /// Returns `None` when there is no saved game, the card rows were dealt
    /// for another game, or its generation no longer resolves all 52 cards;
    /// the caller should deal instead.
    pub fn resume(&mut self) -> Result<Option<u64>> {
        self.ensure_idle()?;
        let state = self
            .history
            .store()
            .read_game_state(self.game.name())
            .map_err(GameError::store("read game state"))?;
        let Some(state) = state else {
            return Ok(None);
        };
        let dealt = self.history.dealt_game()?;
        if dealt.as_deref() != Some(self.game.name()) {
            warn!(game = %self.game, dealt = ?dealt, "card rows belong to another game");
            return Ok(None);
        }
        let Some(deck) = self.history.all_cards_at(state.generation)?.into_deck() else {
            warn!(game = %self.game, generation = state.generation, "saved game does not resolve");
            return Ok(None);
        };

        let saved = self
            .history
            .store()
            .read_all_highlights()
            .map_err(GameError::store("read highlights"))?;
        self.highlights = HighlightSet::new();
        for (value, code) in saved {
            self.highlights.set(value, Highlight::from_code(code));
        }

        self.cards = deck;
        self.generation = state.generation;
        self.undone = state.undone;
        self.events.push(DealerEvent::Resumed { generation: state.generation });
        info!(game = %self.game, generation = state.generation, "resumed game");
        Ok(Some(state.generation))
    }

    // === Transactions ===

    /// Run `action` as one undoable step.
    ///
    /// Card changes staged through [`card_changed`](Self::card_changed) are
    /// committed as a single new generation when `action` succeeds. When it
    /// stages nothing, no generation is created. When it fails, or the
    /// commit fails, nothing is written and the live table is reloaded from
    /// the previous generation. If `action` panics, the transaction stays
    /// open until [`recover`](Self::recover) is called.
    pub fn with_undo<T, F>(&mut self, action: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.ensure_idle()?;
        let previous = self.generation;
        self.transaction = Some(Transaction::new(previous + 1));

        let outcome = action(self);
        let transaction = self.transaction.take().unwrap_or_else(|| Transaction::new(previous + 1));

        let value = match outcome {
            Ok(value) => value,
            Err(err) => return self.abandon(&transaction, previous, err),
        };
        if transaction.staged.is_empty() {
            return Ok(value);
        }

        if let Err(err) = self.history.commit(&transaction.changed(), transaction.target) {
            return self.abandon(&transaction, previous, err);
        }

        self.generation = transaction.target;
        self.undone = false;
        self.events.push(DealerEvent::Committed {
            generation: self.generation,
            changed: transaction.values(),
        });
        debug!(generation = self.generation, cards = transaction.staged.len(), "committed move");

        self.write_pointer()?;
        self.compact()?;
        Ok(value)
    }

    /// Drop a transaction left open by an action that panicked out of
    /// [`with_undo`](Self::with_undo), and reload the live table from the
    /// current generation.
    ///
    /// Until this runs, every later operation fails with
    /// [`GameError::NestedTransaction`]. Nothing was written to the store.
    pub fn recover(&mut self) -> Result<()> {
        let Some(open) = self.transaction.take() else {
            return Ok(());
        };
        warn!(generation = self.generation, staged = open.staged.len(), "dropping abandoned transaction");
        if !open.staged.is_empty() {
            self.cards = self.history.all_cards_at(self.generation)?.require()?;
        }
        self.events.push(DealerEvent::RolledBack {
            generation: self.generation,
        });
        Ok(())
    }

    /// Stage a change to one card inside the open transaction.
    ///
    /// The card is stamped with the transaction's generation and written to
    /// the live table. Returns the number of cards staged so far.
    ///
    /// Panics outside [`with_undo`](Self::with_undo).
    pub fn card_changed(&mut self, card: Card) -> usize {
        let Some(transaction) = self.transaction.as_mut() else {
            panic!("Card {} changed outside of a transaction", card.value());
        };
        let index = card.value().index();
        let after = card.with_generation(transaction.target);
        self.cards[index] = transaction.stage(self.cards[index], after);
        transaction.staged.len()
    }

    /// Apply `change` to the live card `value` and stage the result.
    pub fn change_card<F>(&mut self, value: CardValue, change: F) -> usize
    where
        F: FnOnce(Card) -> Card,
    {
        let card = change(self.find_card(value));
        self.card_changed(card)
    }

    fn abandon<T>(&mut self, transaction: &Transaction, previous: u64, err: GameError) -> Result<T> {
        warn!(generation = previous, error = %err, "transaction failed, restoring table");
        if !transaction.staged.is_empty() {
            self.cards = self.history.all_cards_at(previous)?.require()?;
        }
        self.events.push(DealerEvent::RolledBack { generation: previous });
        Err(err)
    }

    fn ensure_idle(&self) -> Result<()> {
        match &self.transaction {
            Some(open) => Err(GameError::NestedTransaction {
                generation: open.target,
            }),
            None => Ok(()),
        }
    }

    fn compact(&mut self) -> Result<()> {
        let Some(depth) = self.config.max_undo_depth else {
            return Ok(());
        };
        match self.generation.checked_sub(depth) {
            Some(floor) if floor > 0 => {
                self.history.clear_undo(floor)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn write_pointer(&mut self) -> Result<()> {
        let (game, generation, undone) = (self.game.name(), self.generation, self.undone);
        self.history
            .store_mut()
            .update_game_state_pointer(game, generation, undone)
            .map_err(GameError::store("update game state pointer"))
    }

    // === Undo / redo ===

    /// Step back one generation. `None` at the start of the retained history.
    pub fn undo(&mut self) -> Result<Option<u64>> {
        self.ensure_idle()?;
        if !self.can_undo()? {
            return Ok(None);
        }

        let delta = self.history.undo_delta(self.generation)?;
        let changed = self.apply(&delta);
        self.generation -= 1;
        self.undone = true;
        self.write_pointer()?;
        self.events.push(DealerEvent::Undone {
            generation: self.generation,
            changed,
        });
        debug!(generation = self.generation, cards = delta.len(), "undid move");
        Ok(Some(self.generation))
    }

    /// Step forward one generation. `None` when nothing is redoable.
    pub fn redo(&mut self) -> Result<Option<u64>> {
        self.ensure_idle()?;
        let delta = self.history.redo_delta(self.generation + 1)?;
        if delta.is_empty() {
            return Ok(None);
        }

        let changed = self.apply(&delta);
        self.generation += 1;
        self.undone = self.can_redo()?;
        self.write_pointer()?;
        self.events.push(DealerEvent::Redone {
            generation: self.generation,
            changed,
        });
        debug!(generation = self.generation, cards = delta.len(), "redid move");
        Ok(Some(self.generation))
    }

    /// Check if [`undo`](Self::undo) would move.
    pub fn can_undo(&self) -> Result<bool> {
        if self.generation == 0 {
            return Ok(false);
        }
        Ok(self
            .history
            .min_generation()?
            .is_some_and(|floor| self.generation > floor))
    }

    /// Check if [`redo`](Self::redo) would move.
    pub fn can_redo(&self) -> Result<bool> {
        Ok(self
            .history
            .max_generation()?
            .is_some_and(|max| max > self.generation))
    }

    fn apply(&mut self, rows: &[Card]) -> ChangedCards {
        for card in rows {
            self.cards[card.value().index()] = *card;
        }
        rows.iter().map(|card| card.value()).collect()
    }

    // === Highlights ===

    #[must_use]
    pub fn highlight(&self, value: CardValue) -> Highlight {
        self.highlights.get(value)
    }

    #[must_use]
    pub fn highlights(&self) -> &HighlightSet {
        &self.highlights
    }

    /// Cards carrying `highlight`, in identity order.
    #[must_use]
    pub fn highlighted(&self, highlight: Highlight) -> Vec<CardValue> {
        self.highlights.with(highlight)
    }

    /// Set highlights; `Highlight::None` clears a card's highlight.
    pub fn set_highlights(&mut self, pairs: &[(CardValue, Highlight)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let upserts: Vec<(CardValue, u8)> = pairs
            .iter()
            .filter(|(_, highlight)| *highlight != Highlight::None)
            .map(|&(value, highlight)| (value, highlight.code()))
            .collect();
        let removals: Vec<CardValue> = pairs
            .iter()
            .filter(|(_, highlight)| *highlight == Highlight::None)
            .map(|&(value, _)| value)
            .collect();

        let store = self.history.store_mut();
        store
            .upsert_highlights(&upserts)
            .map_err(GameError::store("upsert highlights"))?;
        store
            .delete_highlights(&removals)
            .map_err(GameError::store("delete highlights"))?;

        for &(value, highlight) in pairs {
            self.highlights.set(value, highlight);
        }
        self.events.push(DealerEvent::HighlightsChanged {
            changed: pairs.iter().map(|&(value, _)| value).collect(),
        });
        Ok(())
    }

    /// Remove every highlight.
    pub fn clear_highlights(&mut self) -> Result<()> {
        if self.highlights.is_empty() {
            return Ok(());
        }
        let values = self.highlights.cards();
        self.history
            .store_mut()
            .delete_highlights(&values)
            .map_err(GameError::store("delete highlights"))?;
        self.highlights.clear();
        self.events.push(DealerEvent::HighlightsChanged {
            changed: values.into_iter().collect(),
        });
        Ok(())
    }

    // === Accessors ===

    /// The live card with identity `value`.
    #[must_use]
    pub fn find_card(&self, value: CardValue) -> Card {
        self.cards[value.index()]
    }

    /// The live card with its highlight folded into the flag bits, as a
    /// renderer would draw it.
    #[must_use]
    pub fn rendered(&self, value: CardValue) -> Card {
        self.find_card(value).with_highlight(self.highlight(value).code())
    }

    /// The live table, indexed by identity.
    #[must_use]
    pub fn cards(&self) -> &Deck {
        &self.cards
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The pointer was moved back by undo and redo is available.
    #[must_use]
    pub fn is_undone(&self) -> bool {
        self.undone
    }

    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    #[must_use]
    pub fn game(&self) -> GameKind {
        self.game
    }

    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    pub fn history(&self) -> &GenerationStore<S> {
        &self.history
    }

    pub fn store(&self) -> &S {
        self.history.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.history.store_mut()
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<DealerEvent> {
        mem::take(&mut self.events)
    }

    /// Give back the store handle.
    pub fn into_store(self) -> S {
        self.history.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryStore;

    fn layout() -> Vec<Card> {
        CardValue::all()
            .map(|value| Card::new(0, value, 0, u16::from(value.raw()), CardFlags::default()))
            .collect()
    }

    fn dealer() -> Dealer<MemoryStore> {
        let mut dealer = Dealer::new(MemoryStore::new(), GameKind::Scorpion, HistoryConfig::default());
        dealer.deal_cards(layout()).unwrap();
        dealer.drain_events();
        dealer
    }

    fn card(value: u8) -> CardValue {
        CardValue::new(value)
    }

    fn move_to(dealer: &mut Dealer<MemoryStore>, value: u8, group: u16) -> Result<()> {
        dealer.with_undo(|d| {
            d.change_card(card(value), |c| c.with_group(group));
            Ok(())
        })
    }

    #[test]
    fn test_deal_writes_generation_zero() {
        let dealer = dealer();

        assert_eq!(dealer.generation(), 0);
        assert_eq!(dealer.store().row_count(), DECK_SIZE);
        assert!(!dealer.can_undo().unwrap());
        assert!(!dealer.can_redo().unwrap());
        let state = dealer.store().read_game_state("scorpion").unwrap().unwrap();
        assert_eq!((state.generation, state.undone), (0, false));
    }

    #[test]
    #[should_panic(expected = "Dealt layout holds 51 distinct cards")]
    fn test_deal_requires_full_deck() {
        let mut dealer = Dealer::new(MemoryStore::new(), GameKind::Pyramid, HistoryConfig::default());
        let mut cards = layout();
        cards.pop();
        let _ = dealer.deal_cards(cards);
    }

    #[test]
    fn test_with_undo_commits_one_generation() {
        let mut dealer = dealer();

        let staged = dealer
            .with_undo(|d| {
                d.change_card(card(3), |c| c.with_group(2));
                Ok(d.change_card(card(4), |c| c.with_group(2)))
            })
            .unwrap();

        assert_eq!(staged, 2);
        assert_eq!(dealer.generation(), 1);
        assert_eq!(dealer.find_card(card(3)).group(), 2);
        assert_eq!(dealer.find_card(card(3)).generation(), 1);
        assert_eq!(dealer.history().redo_delta(1).unwrap().len(), 2);

        let events = dealer.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DealerEvent::Committed { generation: 1, changed } if changed.len() == 2));
    }

    #[test]
    fn test_with_undo_without_changes_commits_nothing() {
        let mut dealer = dealer();

        dealer.with_undo(|_| Ok(())).unwrap();
        dealer
            .with_undo(|d| {
                // Same state as before
                d.change_card(card(5), |c| c);
                Ok(())
            })
            .unwrap();

        assert_eq!(dealer.generation(), 0);
        assert_eq!(dealer.store().row_count(), DECK_SIZE);
        assert!(dealer.drain_events().is_empty());
    }

    #[test]
    fn test_change_back_unstages() {
        let mut dealer = dealer();

        let staged = dealer
            .with_undo(|d| {
                d.change_card(card(8), |c| c.with_group(4));
                Ok(d.change_card(card(8), |c| c.with_group(0)))
            })
            .unwrap();

        assert_eq!(staged, 0);
        assert_eq!(dealer.generation(), 0);
        assert_eq!(dealer.find_card(card(8)), layout()[8]);
    }

    #[test]
    fn test_failed_action_restores_table() {
        let mut dealer = dealer();
        move_to(&mut dealer, 1, 3).unwrap();

        let err = dealer
            .with_undo(|d| {
                d.change_card(card(1), |c| c.with_group(6));
                d.change_card(card(2), |c| c.with_group(6));
                Err::<(), _>(GameError::Aborted("illegal".into()))
            })
            .unwrap_err();

        assert!(matches!(err, GameError::Aborted(_)));
        assert_eq!(dealer.generation(), 1);
        assert_eq!(dealer.find_card(card(1)).group(), 3);
        assert_eq!(dealer.find_card(card(2)), layout()[2]);
        assert_eq!(dealer.history().max_generation().unwrap(), Some(1));
        assert!(!dealer.is_in_transaction());
        assert_eq!(
            dealer.drain_events().last(),
            Some(&DealerEvent::RolledBack { generation: 1 })
        );
    }

    #[test]
    fn test_nested_transaction_rejected() {
        let mut dealer = dealer();

        let result = dealer.with_undo(|d| {
            assert!(d.is_in_transaction());
            d.with_undo(|_| Ok(()))
        });

        assert!(matches!(result, Err(GameError::NestedTransaction { generation: 1 })));
        assert!(!dealer.is_in_transaction());
    }

    #[test]
    #[should_panic(expected = "changed outside of a transaction")]
    fn test_card_changed_outside_transaction() {
        let mut dealer = dealer();
        let moved = dealer.find_card(card(0)).with_group(1);
        dealer.card_changed(moved);
    }

    #[test]
    fn test_undo_redo() {
        let mut dealer = dealer();
        move_to(&mut dealer, 1, 3).unwrap();
        move_to(&mut dealer, 1, 5).unwrap();
        dealer.drain_events();

        assert_eq!(dealer.undo().unwrap(), Some(1));
        assert_eq!(dealer.find_card(card(1)).group(), 3);
        assert!(dealer.is_undone());

        assert_eq!(dealer.undo().unwrap(), Some(0));
        assert_eq!(dealer.find_card(card(1)), layout()[1]);
        assert_eq!(dealer.undo().unwrap(), None);

        assert_eq!(dealer.redo().unwrap(), Some(1));
        assert_eq!(dealer.redo().unwrap(), Some(2));
        assert_eq!(dealer.find_card(card(1)).group(), 5);
        assert!(!dealer.is_undone());
        assert_eq!(dealer.redo().unwrap(), None);

        let state = dealer.store().read_game_state("scorpion").unwrap().unwrap();
        assert_eq!((state.generation, state.undone), (2, false));
        assert_eq!(dealer.drain_events().len(), 4);
    }

    #[test]
    fn test_commit_after_undo_discards_redo() {
        let mut dealer = dealer();
        move_to(&mut dealer, 1, 3).unwrap();
        move_to(&mut dealer, 2, 3).unwrap();
        dealer.undo().unwrap();

        move_to(&mut dealer, 9, 4).unwrap();

        assert_eq!(dealer.generation(), 2);
        assert!(!dealer.can_redo().unwrap());
        assert_eq!(dealer.find_card(card(2)), layout()[2]);
        let at_two = dealer.history().all_cards_at(2).unwrap().into_deck().unwrap();
        assert_eq!(at_two[2], layout()[2]);
        assert_eq!(at_two[9].group(), 4);
    }

    #[test]
    fn test_max_undo_depth_compacts() {
        let mut dealer = Dealer::new(
            MemoryStore::new(),
            GameKind::Pyramid,
            HistoryConfig::default().with_max_undo_depth(2),
        );
        dealer.deal_cards(layout()).unwrap();
        for group in 1..=5 {
            move_to(&mut dealer, 7, group).unwrap();
        }

        assert_eq!(dealer.history().min_generation().unwrap(), Some(3));
        assert_eq!(dealer.undo().unwrap(), Some(4));
        assert_eq!(dealer.undo().unwrap(), Some(3));
        assert_eq!(dealer.undo().unwrap(), None);
        assert_eq!(dealer.find_card(card(7)).group(), 3);
    }

    #[test]
    fn test_highlights_write_through() {
        let mut dealer = dealer();
        dealer
            .set_highlights(&[(card(4), Highlight::Selected), (card(3), Highlight::Target)])
            .unwrap();

        assert_eq!(dealer.highlight(card(4)), Highlight::Selected);
        assert_eq!(dealer.highlighted(Highlight::Target), vec![card(3)]);
        assert_eq!(dealer.rendered(card(4)).highlight(), Highlight::Selected.code());
        assert_eq!(dealer.store().read_all_highlights().unwrap().len(), 2);

        // Highlights are not history
        assert_eq!(dealer.generation(), 0);

        dealer.clear_highlights().unwrap();
        assert!(dealer.highlights().is_empty());
        assert!(dealer.store().read_all_highlights().unwrap().is_empty());
        assert_eq!(dealer.drain_events().len(), 2);
    }

    #[test]
    fn test_resume_restores_table() {
        let mut dealer = dealer();
        move_to(&mut dealer, 1, 3).unwrap();
        move_to(&mut dealer, 2, 4).unwrap();
        dealer.undo().unwrap();
        dealer.set_highlights(&[(card(6), Highlight::Hint)]).unwrap();
        let expected = *dealer.cards();

        let store = dealer.into_store();
        let mut resumed = Dealer::new(store, GameKind::Scorpion, HistoryConfig::default());

        assert_eq!(resumed.resume().unwrap(), Some(1));
        assert_eq!(resumed.cards(), &expected);
        assert!(resumed.is_undone());
        assert_eq!(resumed.highlight(card(6)), Highlight::Hint);
        assert_eq!(resumed.redo().unwrap(), Some(2));
    }

    #[test]
    fn test_resume_without_saved_game() {
        let mut dealer = Dealer::new(MemoryStore::new(), GameKind::Pyramid, HistoryConfig::default());
        assert_eq!(dealer.resume().unwrap(), None);
    }
}
