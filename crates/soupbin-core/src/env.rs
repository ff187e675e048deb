//! Environment abstraction for deterministic testing.
//!
//! Decouples the session duties from system resources (time, randomness) so
//! heartbeat and inactivity-timeout behavior can be driven by a virtual clock
//! in tests instead of waiting on real 1 s / 15 s timers.

use std::future::Future;
use std::time::Duration;

/// Abstract environment providing time and async sleep primitives.
///
/// Implementations must guarantee `now()` never goes backwards within a
/// single process.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps until the given duration has elapsed.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Current wall-clock time as seconds since the Unix epoch.
    ///
    /// Used only by the `date` unsequenced command; unrelated to the
    /// monotonic clock used for timers.
    fn wall_clock_secs(&self) -> u64;

    /// Fills the buffer with random bytes, for components that need an
    /// identifier with no durability requirement.
    fn random_bytes(&self, buffer: &mut [u8]);
}
