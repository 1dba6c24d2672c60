//! Pyramid.
//!
//! Twenty-eight cards form a seven-row pyramid, each row overlapping the
//! one above. The other twenty-four make a stock dealt one at a time to a
//! waste pile. Exposed cards are removed in pairs whose ranks add up to 13;
//! kings go alone.

mod game;

pub use game::{coverers, pairs, row_of, slot_of, Pyramid, DISCARD, ROWS, SLOTS, STOCK, WASTE};
