//! Deterministic shuffling for deals.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces the same sequence of deals
//! - **Forkable**: Each new game draws from its own reproducible stream
//!
//! ```
//! use rust_solitaire::core::GameRng;
//!
//! let mut a = GameRng::new(7);
//! let mut b = GameRng::new(7);
//! assert_eq!(a.shuffled_deck(), b.shuffled_deck());
//! ```

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::card::{CardValue, DECK_SIZE};

/// Deterministic RNG backing every deal.
///
/// Uses ChaCha8 for speed while keeping deals reproducible from a seed.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
    fork_counter: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
            fork_counter: 0,
        }
    }

    /// Seed this RNG was created from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fork this RNG to create an independent stream.
    ///
    /// Each fork produces a different but deterministic sequence.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        self.fork_counter += 1;
        let fork_seed = self.seed.wrapping_add(self.fork_counter.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self::new(fork_seed)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    /// All 52 identities in a fresh random order.
    #[must_use]
    pub fn shuffled_deck(&mut self) -> [CardValue; DECK_SIZE] {
        let mut deck = [CardValue::new(0); DECK_SIZE];
        for (slot, value) in deck.iter_mut().zip(CardValue::all()) {
            *slot = value;
        }
        self.shuffle(&mut deck);
        deck
    }
}
