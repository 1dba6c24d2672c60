//! Scorpion.
//!
//! Forty-nine cards are dealt into seven columns, the first few with three
//! face-down cards each, and three more into a kitty. Any face-up card may
//! be moved, with everything below it, onto the next-higher card of its
//! suit. Only kings go to empty columns.

mod game;

pub use game::{Scorpion, COLUMNS, KITTY};
