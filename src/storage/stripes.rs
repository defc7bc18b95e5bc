//! Striped lock array
//!
//! A fixed, power-of-two array of mutexes. Each key hashes to exactly one
//! stripe, so writers to the same key always contend on the same lock
//! while writers to different stripes proceed in parallel. The hash is
//! seedless xxh3-64 and therefore stable across process runs.

use std::sync::{Mutex, MutexGuard};

/// Fixed array of mutual-exclusion locks, indexed by key hash
#[derive(Debug)]
pub struct StripedLocks {
    stripes: Vec<Mutex<()>>,
    mask: u64,
}

impl StripedLocks {
    /// Create `count` stripes, rounded up to the next power of two
    ///
    /// A power-of-two count lets stripe selection be a mask instead of a
    /// modulo.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let n = count.max(1).next_power_of_two();
        Self {
            stripes: (0..n).map(|_| Mutex::new(())).collect(),
            mask: (n - 1) as u64,
        }
    }

    /// Stripe index for a key; stable across process runs
    #[must_use]
    pub fn stripe_of(&self, key: &str) -> usize {
        (twox_hash::xxh3::hash64(key.as_bytes()) & self.mask) as usize
    }

    /// Acquire the stripe lock covering `key`, blocking until available
    pub fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(key)]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stripes
    #[must_use]
    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }
}
