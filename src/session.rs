//! Interactive session: one dealer, one game, one RNG.
//!
//! A [`Session`] is what a front end drives. It forwards clicks to the rule
//! engine, keeps undo and redo free of stale selections, and reports the
//! game status after every interaction.
//!
//! ## Failure handling
//!
//! If history stops resolving (a corrupt or over-compacted store), the
//! session logs it and deals a fresh game rather than leaving the table in
//! an unknown state. Every other error is returned to the caller.

use tracing::{info, warn};

use crate::core::{CardValue, GameError, GameKind, GameOptions, GameRng, HistoryConfig, Result};
use crate::games::Game;
use crate::history::{CardStore, Dealer, DealerEvent};
use crate::rules::{GameStatus, Solitaire};

/// A game in progress over a store.
#[derive(Debug)]
pub struct Session<S: CardStore> {
    dealer: Dealer<S>,
    game: Game,
    rng: GameRng,
    status: GameStatus,
}

impl<S: CardStore> Session<S> {
    /// Open `kind` over `store`.
    ///
    /// Saved options are loaded from the store. A saved game is resumed
    /// when it still resolves to a valid layout for `kind`; otherwise a new
    /// one is dealt from `seed`.
    pub fn open(store: S, kind: GameKind, history: HistoryConfig, seed: u64) -> Result<Self> {
        let saved = store
            .read_game_state(kind.name())
            .map_err(GameError::store("read game state"))?;
        let options = match &saved {
            Some(state) => GameOptions::from_blob(kind, &state.options)?,
            None => GameOptions::default_for(kind),
        };

        let mut session = Self {
            dealer: Dealer::new(store, kind, history),
            game: Game::new(options),
            rng: GameRng::new(seed),
            status: GameStatus::Continue,
        };
        let resumed = session.dealer.resume()?.filter(|&generation| {
            match session.game.is_valid(session.dealer.cards()) {
                None => true,
                Some(err) => {
                    warn!(game = %kind, generation, error = %err, "saved table is not a valid layout");
                    false
                }
            }
        });
        match resumed {
            Some(generation) => {
                session.status = session.game.check_game_over(session.dealer.cards());
                info!(game = %kind, generation, status = ?session.status, "opened saved game");
            }
            None => {
                session.new_game()?;
            }
        }
        session.persist_options()?;
        Ok(session)
    }

    /// Deal a new game.
    pub fn new_game(&mut self) -> Result<GameStatus> {
        let mut deal_rng = self.rng.fork();
        self.game.reset();
        self.dealer.deal(&self.game, &mut deal_rng)?;
        self.status = self.game.check_game_over(self.dealer.cards());
        Ok(self.status)
    }

    /// Replace the game options and save them.
    ///
    /// The table is left as it is; new options apply from the next
    /// interaction.
    pub fn set_options(&mut self, options: GameOptions) -> Result<GameStatus> {
        self.game.set_options(options);
        self.persist_options()?;
        self.refresh_status();
        Ok(self.status)
    }

    /// Click a card. Cards the game ignores are a no-op.
    pub fn click(&mut self, value: CardValue) -> Result<GameStatus> {
        if !self.game.is_clickable(self.dealer.cards(), value) {
            return Ok(self.status);
        }
        let outcome = self.game.on_click(&mut self.dealer, value);
        self.settle(outcome)
    }

    /// Double-click a card. Cards the game ignores are a no-op.
    pub fn double_click(&mut self, value: CardValue) -> Result<GameStatus> {
        if !self.game.is_clickable(self.dealer.cards(), value) {
            return Ok(self.status);
        }
        let outcome = self.game.on_double_click(&mut self.dealer, value);
        self.settle(outcome)
    }

    /// Drag `value` onto `column`. Scorpion only; other games ignore it.
    pub fn drop_on(&mut self, value: CardValue, column: u16) -> Result<GameStatus> {
        let outcome = match self.game.as_scorpion_mut() {
            Some(scorpion) => scorpion.drop_on(&mut self.dealer, value, column),
            None => return Ok(self.status),
        };
        self.settle(outcome)
    }

    pub fn undo(&mut self) -> Result<GameStatus> {
        self.dealer.clear_highlights()?;
        let outcome = self.dealer.undo().map(|generation| generation.is_some());
        self.settle(outcome)
    }

    pub fn redo(&mut self) -> Result<GameStatus> {
        self.dealer.clear_highlights()?;
        let outcome = self.dealer.redo().map(|generation| generation.is_some());
        self.settle(outcome)
    }

    /// Status as of the last interaction.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn dealer(&self) -> &Dealer<S> {
        &self.dealer
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// The game, for toggling cheats.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Take the renderer events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<DealerEvent> {
        self.dealer.drain_events()
    }

    /// Close the session and give back the store.
    pub fn into_store(self) -> S {
        self.dealer.into_store()
    }

    fn persist_options(&mut self) -> Result<()> {
        let blob = self.game.options().to_blob()?;
        let name = self.game.kind().name();
        self.dealer
            .store_mut()
            .write_game_options(name, &blob)
            .map_err(GameError::store("write game options"))
    }

    fn settle(&mut self, outcome: Result<bool>) -> Result<GameStatus> {
        match outcome {
            Ok(_) => {
                self.refresh_status();
                Ok(self.status)
            }
            Err(GameError::IncompleteHistory { generation, resolved }) => {
                warn!(generation, resolved, "history no longer resolves, dealing a new game");
                self.new_game()
            }
            Err(err) => Err(err),
        }
    }

    fn refresh_status(&mut self) {
        let status = self.game.check_game_over(self.dealer.cards());
        if status != self.status && status.is_over() {
            info!(
                game = %self.game.kind(),
                generation = self.dealer.generation(),
                status = ?status,
                "game over"
            );
        }
        self.status = status;
    }
}
