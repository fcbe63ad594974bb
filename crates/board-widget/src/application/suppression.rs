//! Short suppression windows that absorb flicker-inducing signals.
//!
//! Two kinds of signal are suppressed:
//!
//! - A deselect callback that arrives within `select_window_ms` of the most
//!   recent non-null selection.  Surfaces fire one as a side effect of some
//!   internal updates; forwarding it would make the host's UI flicker.
//! - A host "clear" (an empty `setLegalDests` / `setPremoveDests`) that
//!   arrives within `dests_window_ms` of the most recent non-empty push of
//!   the same kind.  Rapid successive host pushes otherwise blink the dots.
//!
//! A window is half-open: a signal exactly `window` ms after the last
//! non-empty one is *not* suppressed.

/// Which destination set a clear signal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestKind {
    Legal,
    Premove,
}

/// Timestamps of the last non-empty signal of each kind.
#[derive(Debug, Clone)]
pub struct SuppressionTimers {
    select_window_ms: u64,
    dests_window_ms: u64,
    last_select_ms: Option<u64>,
    last_legal_ms: Option<u64>,
    last_premove_ms: Option<u64>,
}

impl SuppressionTimers {
    pub fn new(select_window_ms: u64, dests_window_ms: u64) -> Self {
        Self {
            select_window_ms,
            dests_window_ms,
            last_select_ms: None,
            last_legal_ms: None,
            last_premove_ms: None,
        }
    }

    /// Records a non-null selection at `now_ms`.
    pub fn note_select(&mut self, now_ms: u64) {
        self.last_select_ms = Some(now_ms);
    }

    /// `true` if a deselect at `now_ms` falls inside the selection window.
    pub fn suppresses_deselect(&self, now_ms: u64) -> bool {
        within(self.last_select_ms, now_ms, self.select_window_ms)
    }

    /// Records a non-empty destination push of `kind` at `now_ms`.
    pub fn note_dests(&mut self, kind: DestKind, now_ms: u64) {
        *self.slot(kind) = Some(now_ms);
    }

    /// `true` if an empty push of `kind` at `now_ms` falls inside its window.
    pub fn suppresses_clear(&self, kind: DestKind, now_ms: u64) -> bool {
        let last = match kind {
            DestKind::Legal => self.last_legal_ms,
            DestKind::Premove => self.last_premove_ms,
        };
        within(last, now_ms, self.dests_window_ms)
    }

    fn slot(&mut self, kind: DestKind) -> &mut Option<u64> {
        match kind {
            DestKind::Legal => &mut self.last_legal_ms,
            DestKind::Premove => &mut self.last_premove_ms,
        }
    }
}

fn within(last: Option<u64>, now_ms: u64, window_ms: u64) -> bool {
    last.is_some_and(|t| now_ms.saturating_sub(t) < window_ms)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
