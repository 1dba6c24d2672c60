//! Change notifications for the rendering collaborator.
//!
//! The dealer queues one event per completed operation. A renderer drains
//! the queue after each interaction and redraws the listed cards; the engine
//! itself holds no UI state.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::CardValue;

/// Cards touched by one operation. Most moves touch only a few cards.
pub type ChangedCards = SmallVec<[CardValue; 8]>;

/// What changed on the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealerEvent {
    /// A new game was dealt; every card changed.
    Dealt { generation: u64 },

    /// The live table was reloaded from saved history.
    Resumed { generation: u64 },

    /// A transaction committed a new generation.
    Committed { generation: u64, changed: ChangedCards },

    /// A transaction failed; the table was restored to `generation`.
    RolledBack { generation: u64 },

    /// Undo moved back to `generation`.
    Undone { generation: u64, changed: ChangedCards },

    /// Redo moved forward to `generation`.
    Redone { generation: u64, changed: ChangedCards },

    /// The highlight overlay changed for these cards.
    HighlightsChanged { changed: ChangedCards },
}

impl DealerEvent {
    /// Generation the table is at after this event, if it moved.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        match self {
            DealerEvent::Dealt { generation }
            | DealerEvent::Resumed { generation }
            | DealerEvent::Committed { generation, .. }
            | DealerEvent::RolledBack { generation }
            | DealerEvent::Undone { generation, .. }
            | DealerEvent::Redone { generation, .. } => Some(*generation),
            DealerEvent::HighlightsChanged { .. } => None,
        }
    }
}
