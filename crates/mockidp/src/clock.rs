//! Swappable time source.
//!
//! Every expiry computation in the crate reads time through [`Clock`] rather
//! than the system clock, so tests can simulate elapsed time (a refresh token
//! minted 24 hours ago, an authorization code past its window) without
//! sleeping.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use time::OffsetDateTime;

/// A source of "now".
///
/// Implementations must be safe to share across request handlers.
pub trait Clock: Send + Sync {
    /// Returns the current instant according to this clock.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that reports a fixed instant until told otherwise.
#[derive(Debug)]
pub struct FrozenClock {
    now: RwLock<OffsetDateTime>,
}

impl FrozenClock {
    /// Creates a clock frozen at `instant`.
    #[must_use]
    pub fn new(instant: OffsetDateTime) -> Self {
        Self {
            now: RwLock::new(instant),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: OffsetDateTime) {
        *self.now.write().unwrap() = instant;
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.write().unwrap();
        *now += delta;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.read().unwrap()
    }
}

/// Applies an adjustable forward offset to a base clock.
///
/// The server wraps whatever clock it was constructed with in one of these,
/// so [`MockIdp::fast_forward`](crate::server::MockIdp::fast_forward) works
/// over the system clock and injected test clocks alike.
pub struct OffsetClock {
    base: Arc<dyn Clock>,
    offset: RwLock<Duration>,
}

impl OffsetClock {
    /// Wraps `base` with a zero offset.
    #[must_use]
    pub fn new(base: Arc<dyn Clock>) -> Self {
        Self {
            base,
            offset: RwLock::new(Duration::ZERO),
        }
    }

    /// Pushes the reported time forward by `delta`. Offsets accumulate.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.write().unwrap();
        *offset += delta;
    }

    /// Returns the accumulated offset.
    #[must_use]
    pub fn offset(&self) -> Duration {
        *self.offset.read().unwrap()
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> OffsetDateTime {
        self.base.now() + *self.offset.read().unwrap()
    }
}
