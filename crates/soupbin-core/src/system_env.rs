//! Production `Environment` implementation using system time.
//!
//! Uses `std::time::Instant` for monotonic time, `tokio::time::sleep` for
//! async waits, `std::time::SystemTime` for the wall clock consumed by the
//! `date` command, and `getrandom` for any incidental randomness.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::env::Environment;

/// Production environment using real system time.
#[derive(Clone, Copy, Default)]
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
    fn wall_clock_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("invariant: system clock is after the Unix epoch")
            .as_secs()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG is available");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn time_advances() {
        let env = SystemEnv::new();
        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();
        assert!(t2 > t1);
    }

    #[tokio::test]
    async fn sleep_waits_at_least_the_requested_duration() {
        let env = SystemEnv::new();
        let start = env.now();
        env.sleep(Duration::from_millis(20)).await;
        assert!(env.now() - start >= Duration::from_millis(20));
    }

    #[test]
    fn wall_clock_is_recent() {
        let env = SystemEnv::new();
        // Any time after 2020-01-01 is a sane sanity bound.
        assert!(env.wall_clock_secs() > 1_577_836_800);
    }
}
