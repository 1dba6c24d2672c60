//! Game and history configuration.
//!
//! Each game variant carries a small set of named options that are
//! persisted with its game state as a `bincode` blob. History retention is
//! configured separately through [`HistoryConfig`].

use serde::{Deserialize, Serialize};

use super::error::{GameError, Result};

/// The closed set of supported games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKind {
    Scorpion,
    Pyramid,
}

impl GameKind {
    /// Stable name used as the game-state key in the store.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            GameKind::Scorpion => "scorpion",
            GameKind::Pyramid => "pyramid",
        }
    }

    /// Parse a stored game name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scorpion" => Some(GameKind::Scorpion),
            "pyramid" => Some(GameKind::Pyramid),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scorpion options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorpionOptions {
    /// A king moved to an empty column leaves the cards below it behind,
    /// unless they start with its own queen.
    pub king_moves_alone: bool,

    /// How many columns (from the left) start with three face-down cards.
    pub face_down_columns: u8,
}

impl Default for ScorpionOptions {
    fn default() -> Self {
        Self {
            king_moves_alone: false,
            face_down_columns: 4,
        }
    }
}

impl ScorpionOptions {
    #[must_use]
    pub fn with_king_moves_alone(mut self, alone: bool) -> Self {
        self.king_moves_alone = alone;
        self
    }

    /// Set the number of columns dealt with face-down cards (3 or 4).
    #[must_use]
    pub fn with_face_down_columns(mut self, columns: u8) -> Self {
        assert!((3..=4).contains(&columns), "Face-down columns must be 3 or 4");
        self.face_down_columns = columns;
        self
    }
}

/// Pyramid options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidOptions {
    /// A card covered only by its partner may be paired with it.
    pub partial_cover: bool,

    /// Clearing the 28 pyramid cards wins, stock and waste notwithstanding.
    pub clear_pyramid_only: bool,

    /// Total passes through the stock, including the first.
    pub stock_pass_count: u8,
}

impl Default for PyramidOptions {
    fn default() -> Self {
        Self {
            partial_cover: false,
            clear_pyramid_only: false,
            stock_pass_count: 3,
        }
    }
}

impl PyramidOptions {
    #[must_use]
    pub fn with_partial_cover(mut self, partial: bool) -> Self {
        self.partial_cover = partial;
        self
    }

    #[must_use]
    pub fn with_clear_pyramid_only(mut self, pyramid_only: bool) -> Self {
        self.clear_pyramid_only = pyramid_only;
        self
    }

    /// Set the total number of stock passes (1-7).
    #[must_use]
    pub fn with_stock_pass_count(mut self, passes: u8) -> Self {
        assert!((1..=7).contains(&passes), "Stock pass count must be 1-7");
        self.stock_pass_count = passes;
        self
    }
}

/// Options for whichever game is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOptions {
    Scorpion(ScorpionOptions),
    Pyramid(PyramidOptions),
}

impl GameOptions {
    /// Default options for a game.
    #[must_use]
    pub fn default_for(kind: GameKind) -> Self {
        match kind {
            GameKind::Scorpion => GameOptions::Scorpion(ScorpionOptions::default()),
            GameKind::Pyramid => GameOptions::Pyramid(PyramidOptions::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> GameKind {
        match self {
            GameOptions::Scorpion(_) => GameKind::Scorpion,
            GameOptions::Pyramid(_) => GameKind::Pyramid,
        }
    }

    /// Encode as the game-state options blob.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|source| GameError::Options {
            game: self.kind().name(),
            source,
        })
    }

    /// Decode an options blob saved for `kind`.
    ///
    /// An empty blob yields the defaults. A blob for a different game is
    /// treated as corrupt.
    pub fn from_blob(kind: GameKind, blob: &[u8]) -> Result<Self> {
        if blob.is_empty() {
            return Ok(Self::default_for(kind));
        }
        let options: GameOptions = bincode::deserialize(blob).map_err(|source| GameError::Options {
            game: kind.name(),
            source,
        })?;
        if options.kind() != kind {
            return Err(GameError::Options {
                game: kind.name(),
                source: Box::new(bincode::ErrorKind::Custom(format!(
                    "blob holds {} options",
                    options.kind()
                ))),
            });
        }
        Ok(options)
    }
}

/// History retention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Undo depth to retain. After each commit, rows superseded more than
    /// this many generations back are compacted. `None` keeps everything.
    pub max_undo_depth: Option<u64>,
}

impl HistoryConfig {
    #[must_use]
    pub fn with_max_undo_depth(mut self, depth: u64) -> Self {
        self.max_undo_depth = Some(depth);
        self
    }
}
