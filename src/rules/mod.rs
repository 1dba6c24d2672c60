//! Rules contract for solitaire variants.
//!
//! Variants implement [`Solitaire`] to define:
//! - The deal layout
//! - What a click or double-click does
//! - Win/loss conditions
//!
//! The dealer and session call into `Solitaire` but never interpret
//! variant-specific groups directly.

pub mod engine;

pub use engine::{GameStatus, Solitaire};
pub(crate) use engine::commit_step;
