//! Monotonic millisecond time source.

use core::cell::Cell;

/// Millisecond clock used for every timed comparison in the core.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Milliseconds since `since_ms`, saturating at zero.
    fn elapsed_ms(&self, since_ms: u64) -> u64 {
        self.now_ms().saturating_sub(since_ms)
    }
}

/// Hand-driven clock for tests and host simulation.
#[derive(Default)]
pub struct FakeClock {
    now_ms: Cell<u64>,
}

impl FakeClock {
    pub const fn new() -> Self {
        Self { now_ms: Cell::new(0) }
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
