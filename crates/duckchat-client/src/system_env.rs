//! Production Environment implementation using system time and RNG.

use std::time::Duration;

use duckchat_core::Environment;

/// Production environment: `std::time::Instant`, tokio sleep, and the OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. Message ids cannot be generated without it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG is available");
    }
}

#[cfg(test)]
mod tests {
    use duckchat_core::MessageId;

    use super::*;

    #[test]
    fn generated_ids_differ() {
        let env = SystemEnv::new();
        assert_ne!(MessageId::generate(&env), MessageId::generate(&env));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_uses_tokio_time() {
        let start = tokio::time::Instant::now();
        SystemEnv::new().sleep(Duration::from_secs(5)).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
