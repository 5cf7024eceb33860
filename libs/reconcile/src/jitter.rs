//! Jitter: randomized delay decorrelating rival instances' writes.
//!
//! An instance with fewer classes to list would otherwise reach the
//! store first in every race, winning on speed rather than any
//! meaningful precedence. Sleeping a uniformly random duration before
//! the conditional write breaks that coupling.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound of the default jitter interval.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1500);

/// A strategy that suspends the calling task for a while before the
/// conditional write. Swap in [`NoJitter`] for deterministic tests.
#[async_trait]
pub trait Jitter: Send + Sync {
    /// Suspends the calling task for the next jitter interval.
    async fn sleep(&self);
}

/// Sleeps a uniformly random duration in `[0, max)`.
///
/// Owns its generator; nothing here touches the ambient thread-local
/// RNG, so seeded instances replay the same delay sequence.
pub struct RandomJitter {
    max: Duration,
    rng: Mutex<StdRng>,
}

impl RandomJitter {
    /// Creates a jitterer seeded from OS entropy.
    #[must_use]
    pub fn new(max: Duration) -> Self {
        Self {
            max,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates a jitterer with a fixed seed.
    #[must_use]
    pub fn seeded(max: Duration, seed: u64) -> Self {
        Self {
            max,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draws the next delay without sleeping.
    pub fn sample(&self) -> Duration {
        let max_millis = self.max.as_millis() as u64;
        if max_millis == 0 {
            return Duration::ZERO;
        }
        let drawn = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..max_millis);
        Duration::from_millis(drawn)
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_JITTER)
    }
}

#[async_trait]
impl Jitter for RandomJitter {
    async fn sleep(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// A jitterer that never sleeps, for tests and single-instance hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

#[async_trait]
impl Jitter for NoJitter {
    async fn sleep(&self) {}
}
