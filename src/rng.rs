//! Deterministic RNG service.
//!
//! A land's recorded rng seed (`ReevaluationRecordMetadata::rng_seed`) is
//! meaningless unless handlers actually draw randomness from a seeded,
//! land-owned source rather than thread-local/OS randomness. `DeterministicRng`
//! wraps `rand_pcg::Pcg64`, a fixed, portable PRNG algorithm (unlike
//! `rand::rngs::StdRng`, whose algorithm is not guaranteed stable across
//! `rand` releases) so the same seed reproduces the same draw sequence
//! across live and reevaluation runs. Installed into a `LandKeeper`'s
//! `ServiceRegistry` and reached from handlers via `ctx.services.get()`.
//!
//! `ServiceRegistry` requires every service to be `Sync` (handlers borrow it
//! through a shared `&ServiceRegistry`), so the generator sits behind a
//! `std::sync::Mutex` rather than a `RefCell` — a land is single-writer, but
//! the service itself must still type-check as thread-safe.

use std::sync::Mutex;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64;

pub struct DeterministicRng {
    inner: Mutex<Pcg64>,
    seed: u64,
}

impl DeterministicRng {
    pub fn from_seed(seed: u64) -> Self {
        Self { inner: Mutex::new(Pcg64::seed_from_u64(seed)), seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u64(&self) -> u64 {
        self.inner.lock().expect("rng lock poisoned").next_u64()
    }

    pub fn gen_range(&self, range: std::ops::Range<i64>) -> i64 {
        self.inner.lock().expect("rng lock poisoned").random_range(range)
    }
}
