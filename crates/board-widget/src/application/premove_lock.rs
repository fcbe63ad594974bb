//! Premove lock: keeps a committed premove alive until the user (or host)
//! deliberately releases it.
//!
//! # State machine
//!
//! ```text
//!              commit(a,b)
//!   Unlocked ─────────────────▶ Locked(a,b) ──┐ commit(c,d): rejected, (a,b) re-applied
//!       ▲                          │  ▲       │ unset, not armed: re-locked
//!       │   unset while armed      │  └───────┘
//!       └──────────────────────────┘
//! ```
//!
//! The surface reports *every* premove unset the same way, whether the user
//! asked for it or an internal re-render dropped it.  The four permitted
//! clearing gestures (secondary click, pointer-down on the premove's origin,
//! a host `clearPremoves`, a completed move) call
//! [`PremoveLock::arm_clearance`] immediately before triggering the unset.
//! The next [`PremoveLock::on_unset`] consumes the flag: armed means release,
//! unarmed means the unset was accidental and the caller must re-apply the
//! premove.

use board_core::Square;
use tracing::debug;

use super::surface::MovePair;

/// Lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked { from: Square, to: Square },
}

/// Result of a surface premove commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The lock was free and now holds the new premove.  Notify the host.
    Locked,
    /// The same premove was reported again.  Nothing to do.
    Unchanged,
    /// A different premove was attempted while locked.  Re-apply `keep`.
    Rejected { keep: MovePair },
}

/// Result of a surface premove unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsetOutcome {
    /// A permitted gesture released the lock.  Notify the host.
    Released,
    /// The unset was accidental.  Re-apply this premove.
    Relock(MovePair),
    /// Nothing was locked.
    Ignored,
}

/// The lock plus its one-shot clearance flag.
#[derive(Debug, Clone)]
pub struct PremoveLock {
    state: LockState,
    clearance_armed: bool,
}

impl PremoveLock {
    pub fn new() -> Self {
        Self {
            state: LockState::Unlocked,
            clearance_armed: false,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// The committed premove, if locked.
    pub fn committed(&self) -> Option<MovePair> {
        match self.state {
            LockState::Locked { from, to } => Some((from, to)),
            LockState::Unlocked => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.clearance_armed
    }

    /// Handles the surface committing `from → to`.
    pub fn on_commit(&mut self, from: Square, to: Square) -> CommitOutcome {
        match self.state {
            LockState::Unlocked => {
                self.state = LockState::Locked { from, to };
                CommitOutcome::Locked
            }
            LockState::Locked { from: a, to: b } if (a, b) == (from, to) => CommitOutcome::Unchanged,
            LockState::Locked { from: a, to: b } => {
                debug!("premove {from}{to} rejected; {a}{b} is locked");
                CommitOutcome::Rejected { keep: (a, b) }
            }
        }
    }

    /// Raises the clearance flag.  Set only right before a permitted unset.
    pub fn arm_clearance(&mut self) {
        self.clearance_armed = true;
    }

    /// Lowers the clearance flag without releasing.
    ///
    /// Used when a permitted gesture turned out to have nothing to unset,
    /// so a later accidental unset is not mistaken for a deliberate one.
    pub fn disarm(&mut self) {
        self.clearance_armed = false;
    }

    /// Handles the surface reporting that its premove was dropped.
    pub fn on_unset(&mut self) -> UnsetOutcome {
        let armed = std::mem::take(&mut self.clearance_armed);
        match (self.state, armed) {
            (LockState::Unlocked, _) => UnsetOutcome::Ignored,
            (LockState::Locked { .. }, true) => {
                self.state = LockState::Unlocked;
                UnsetOutcome::Released
            }
            (LockState::Locked { from, to }, false) => {
                debug!("accidental premove unset; re-locking {from}{to}");
                UnsetOutcome::Relock((from, to))
            }
        }
    }
}

impl Default for PremoveLock {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
