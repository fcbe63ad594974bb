//! Trust-on-first-use origin locking.
//!
//! A freshly loaded widget has no idea who embeds it, so it starts out
//! trusting the wildcard origin `*`.  The sender of the first accepted
//! `init` command becomes the trusted origin for the rest of the session:
//! from then on, frames from any other origin are dropped before they are
//! even decoded, and every outbound frame is addressed to that origin
//! literally.
//!
//! ```text
//!   Wildcard ──adopt("https://host.example")──▶ Concrete("https://host.example")
//!                                                     │
//!                                                     └── never transitions again
//! ```

use std::fmt;

use tracing::info;

/// The wildcard target used before any origin has been adopted.
pub const WILDCARD_ORIGIN: &str = "*";

/// Which counterpart origin the session trusts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustedOrigin {
    /// No `init` accepted yet: any origin may talk to the widget.
    Wildcard,
    /// Locked to exactly this origin.
    Concrete(String),
}

impl TrustedOrigin {
    /// The literal postMessage target string for this origin.
    pub fn as_target(&self) -> &str {
        match self {
            TrustedOrigin::Wildcard => WILDCARD_ORIGIN,
            TrustedOrigin::Concrete(o) => o,
        }
    }

    /// `true` once an origin has been adopted.
    pub fn is_concrete(&self) -> bool {
        matches!(self, TrustedOrigin::Concrete(_))
    }
}

impl fmt::Display for TrustedOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_target())
    }
}

/// Gatekeeper for inbound frames and addresser for outbound ones.
#[derive(Debug, Clone)]
pub struct OriginGuard {
    trusted: TrustedOrigin,
}

impl OriginGuard {
    /// Creates a guard in the wildcard state.
    pub fn new() -> Self {
        Self {
            trusted: TrustedOrigin::Wildcard,
        }
    }

    /// Returns `true` if a frame from `candidate` may proceed to decoding.
    pub fn admits(&self, candidate: &str) -> bool {
        match &self.trusted {
            TrustedOrigin::Wildcard => true,
            TrustedOrigin::Concrete(o) => o == candidate,
        }
    }

    /// Locks the guard to `candidate` if it is still in the wildcard state.
    ///
    /// Returns `true` only when this call performed the adoption.  A literal
    /// `*` is never adopted, since it would leave the guard wide open while
    /// claiming to be locked.
    pub fn adopt(&mut self, candidate: &str) -> bool {
        if self.trusted.is_concrete() || candidate == WILDCARD_ORIGIN {
            return false;
        }
        info!("adopting trusted origin {candidate}");
        self.trusted = TrustedOrigin::Concrete(candidate.to_string());
        true
    }

    /// The currently trusted origin.
    pub fn trusted(&self) -> &TrustedOrigin {
        &self.trusted
    }

    /// Where outbound frames must be addressed.
    pub fn outbound_target(&self) -> &str {
        self.trusted.as_target()
    }
}

impl Default for OriginGuard {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
