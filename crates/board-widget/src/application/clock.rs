//! Time source for suppression windows and outbound timestamps.
//!
//! The reconciler never calls `Instant::now()` directly.  It asks a
//! [`Clock`], so tests can step time by exact milliseconds and assert the
//! 199 ms / 200 ms boundary of a suppression window deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Millisecond time source.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Monotonic milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;

    /// Wall-clock milliseconds since the Unix epoch, for envelope `ts`.
    fn epoch_ms(&self) -> i64;
}

/// Production clock backed by [`Instant`] and [`SystemTime`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn epoch_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Starts at `0` and only moves when [`advance`](Self::advance) or
/// [`set`](Self::set) is called.  `epoch_ms` reports the same value, offset
/// by a fixed base.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

/// Epoch offset reported by [`ManualClock::epoch_ms`].
const MANUAL_EPOCH_BASE_MS: i64 = 1_700_000_000_000;

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Jumps to an absolute time.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    fn epoch_ms(&self) -> i64 {
        MANUAL_EPOCH_BASE_MS + self.now_ms() as i64
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
