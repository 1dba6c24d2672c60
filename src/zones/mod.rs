//! Table layout: groups (piles) and positions.
//!
//! Games number their own groups (columns, stock, waste, ...). The layout
//! index only knows that every card has a group and a position.

pub mod layout;

pub use layout::{Layout, LayoutError};
