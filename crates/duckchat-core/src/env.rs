//! Environment abstraction for deterministic testing.
//!
//! Decouples room logic from system resources (time, randomness). Production
//! uses the wall clock and OS entropy; the simulation harness uses virtual time
//! and a seeded RNG so that generated message ids are reproducible.

use std::time::Duration;

/// Abstract environment providing time, randomness, and sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated `random_bytes()` produces the same
///   sequence of bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type. `std::time::Instant` in production, virtual time in
    /// simulation.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this (reconnect spacing). State machines never
    /// sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random `u128`.
    ///
    /// Client-generated message ids are 128 random bits.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }
}
