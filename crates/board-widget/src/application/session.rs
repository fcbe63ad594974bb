//! Per-connection trust state: the origin guard plus the bound counterpart.

use std::fmt;

use tracing::debug;
use uuid::Uuid;

use board_core::protocol::{OriginGuard, TrustedOrigin};

/// Opaque handle to the host-side window replies are posted back to.
///
/// The WebSocket transport hands out one per `/host` connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterpartHandle(pub Uuid);

impl CounterpartHandle {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CounterpartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who the widget is talking to.
#[derive(Debug, Default)]
pub struct Session {
    guard: OriginGuard,
    counterpart: Option<CounterpartHandle>,
    initialized: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admits(&self, origin: &str) -> bool {
        self.guard.admits(origin)
    }

    /// Trust-on-first-use adoption.  Returns `true` when the trust changed.
    pub fn adopt_origin(&mut self, origin: &str) -> bool {
        self.guard.adopt(origin)
    }

    pub fn trusted_origin(&self) -> &TrustedOrigin {
        self.guard.trusted()
    }

    pub fn outbound_target(&self) -> &str {
        self.guard.outbound_target()
    }

    /// Remembers where replies go.  Only the first handle is kept.
    pub fn bind_counterpart(&mut self, handle: CounterpartHandle) {
        if self.counterpart.is_none() {
            debug!("binding counterpart {handle}");
            self.counterpart = Some(handle);
        }
    }

    pub fn counterpart(&self) -> Option<CounterpartHandle> {
        self.counterpart
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// `reset` drops the board but keeps the trusted origin and counterpart.
    pub fn mark_reset(&mut self) {
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_counterpart_wins() {
        let mut s = Session::new();
        let first = CounterpartHandle::new_v4();
        s.bind_counterpart(first);
        s.bind_counterpart(CounterpartHandle::new_v4());
        assert_eq!(s.counterpart(), Some(first));
    }

    #[test]
    fn test_reset_keeps_trust() {
        let mut s = Session::new();
        s.adopt_origin("https://host.example");
        s.mark_initialized();
        s.mark_reset();
        assert!(!s.is_initialized());
        assert_eq!(s.outbound_target(), "https://host.example");
        assert!(!s.admits("https://evil.example"));
    }
}
