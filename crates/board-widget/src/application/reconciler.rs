//! Board state reconciler: the single writer of everything the rendering
//! surface shows.
//!
//! Host commands arrive asynchronously and carry authoritative state
//! (position, turn, destinations).  The user meanwhile builds up transient
//! state on the surface (a selection, a committed premove).  Because the
//! surface replaces every sub-state it is handed, a naive position push
//! would wipe the legal-move dots and the premove highlight.  Every
//! mutation here therefore follows the same shape:
//!
//! ```text
//!   host command ──▶ update BoardView ──▶ surface.apply(partial)
//!                                              │
//!                                              ▼
//!                         re-apply authoritative DestinationSet
//!                         re-apply committed premove highlight
//!                                              │
//!                                              ▼
//!                         drain surface callbacks ──▶ outbound events
//! ```
//!
//! # Turn authority
//!
//! The player is *on turn* when `movable_color` is a concrete colour equal
//! to `turn_color`.  On turn, legal destinations are shown and premove
//! destinations force-cleared; off turn, the reverse.  This is evaluated
//! after every `setPosition`, `setTurn`, `setDraggable` and `setFreeMode`,
//! not only at `init`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use board_core::domain::{Color, DestinationSet, FenError, MovableColor, PieceMap, Square};
use board_core::protocol::messages::{
    PayloadError, SetDraggablePayload, SetPositionPayload, WidgetEvent,
};

use super::clock::Clock;
use super::premove_lock::{CommitOutcome, PremoveLock, UnsetOutcome};
use super::suppression::{DestKind, SuppressionTimers};
use super::surface::{
    MovePair, PartialState, PointerButton, RenderingSurface, SurfaceConfig, SurfaceEvent,
    SurfaceGesture,
};
use crate::domain::config::TimingConfig;

/// Placement shown by a freshly constructed board.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

/// Upper bound on callback-drain rounds per handler, in case a surface keeps
/// emitting in response to our own re-applications.
const MAX_PUMP_ROUNDS: usize = 16;

// ── Error type ────────────────────────────────────────────────────────────────

/// Failures while executing a host command.
///
/// The `Display` text is what the host sees in `ack.error` and in the
/// standalone `error` event.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A board command arrived before `init` (or after `reset`).
    #[error("board not ready")]
    BoardNotReady,

    /// The payload did not match the command's schema.
    #[error(transparent)]
    MalformedPayload(#[from] PayloadError),

    /// `setPosition.fen` had a malformed placement field.
    #[error("invalid FEN: {0}")]
    InvalidFen(#[from] FenError),

    /// `setSize` with a zero dimension.
    #[error("invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

// ── Reconciler-owned state ────────────────────────────────────────────────────

/// The logical board as last pushed by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub fen: String,
    pub orientation: Color,
    pub turn_color: Color,
    pub last_move: Option<MovePair>,
    pub check: bool,
    pub movable_color: MovableColor,
    pub draggable_enabled: bool,
    pub free_mode: bool,
}

/// The user's current selection and when it was made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<Square>,
    pub selected_at_ms: u64,
}

impl SelectionState {
    fn clear(&mut self) {
        self.selected = None;
    }
}

/// Mediates every mutation between host commands, user gestures and the
/// rendering surface.
pub struct BoardReconciler<S: RenderingSurface> {
    surface: S,
    clock: Arc<dyn Clock>,
    view: BoardView,
    selection: SelectionState,
    legal_dests: DestinationSet,
    premove_dests: DestinationSet,
    lock: PremoveLock,
    timers: SuppressionTimers,
    selection_persist_ms: u64,
    outbox: Vec<WidgetEvent>,
}

impl<S: RenderingSurface> BoardReconciler<S> {
    /// Takes ownership of a freshly configured surface and pushes the
    /// initial board state to it.
    pub fn new(
        surface: S,
        config: &SurfaceConfig,
        timing: &TimingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let view = BoardView {
            fen: START_FEN.to_string(),
            orientation: config.orientation,
            turn_color: Color::White,
            last_move: None,
            check: false,
            movable_color: config.movable_color,
            draggable_enabled: true,
            free_mode: false,
        };
        let mut board = Self {
            surface,
            clock,
            view,
            selection: SelectionState::default(),
            legal_dests: DestinationSet::new(),
            premove_dests: DestinationSet::new(),
            lock: PremoveLock::new(),
            timers: SuppressionTimers::new(
                timing.select_suppress_ms,
                timing.dests_clear_suppress_ms,
            ),
            selection_persist_ms: timing.selection_persist_ms,
            outbox: Vec::new(),
        };
        board.push_full_state();
        board
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn legal_dests(&self) -> &DestinationSet {
        &self.legal_dests
    }

    pub fn premove_dests(&self) -> &DestinationSet {
        &self.premove_dests
    }

    pub fn premove_lock(&self) -> &PremoveLock {
        &self.lock
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface, for injecting callbacks in tests.
    /// Call [`pump`](Self::pump) afterwards so they are processed.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// `true` when the local player may move right now.
    pub fn is_on_turn(&self) -> bool {
        self.view.movable_color.concrete() == Some(self.view.turn_color)
    }

    /// Removes and returns events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ── Host commands ─────────────────────────────────────────────────────────

    /// `setPosition`: pushes a new placement and re-derives everything else.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidFen`] if the placement is malformed;
    /// the surface is left untouched in that case.
    pub fn set_position(&mut self, p: SetPositionPayload) -> Result<(), CommandError> {
        let pieces = PieceMap::from_fen(&p.fen)?;

        self.view.fen = p.fen.clone();
        self.view.last_move = p.last_move;
        self.view.check = p.check.unwrap_or(false);
        if let Some(turn) = p.turn_color {
            self.view.turn_color = turn;
        }
        if let Some(orientation) = p.orientation {
            self.view.orientation = orientation;
        }

        self.push(PartialState {
            fen: Some(p.fen),
            pieces: Some(pieces),
            last_move: Some(p.last_move),
            check: Some(self.view.check),
            turn_color: p.turn_color,
            orientation: p.orientation,
            ..Default::default()
        });

        self.restore_or_clear_selection();
        self.reapply();
        self.pump();
        Ok(())
    }

    /// `setLegalDests`: replaces the legal destinations.  They are shown only
    /// on the player's own turn; off turn the premove dots stay visible.
    pub fn set_legal_dests(&mut self, dests: DestinationSet) {
        let now = self.clock.now_ms();
        if dests.is_empty() && self.timers.suppresses_clear(DestKind::Legal, now) {
            debug!("ignoring legal-dests clear inside suppression window");
            return;
        }
        if !dests.is_empty() {
            self.timers.note_dests(DestKind::Legal, now);
        }

        self.legal_dests = dests.without_friendly_targets(self.surface.pieces());
        self.reapply();
        self.pump();
    }

    /// `setPremoveDests`: replaces the premove destinations and clears legal
    /// dots from the surface.  A no-op on the player's own turn.
    pub fn set_premove_dests(&mut self, dests: DestinationSet) {
        if self.is_on_turn() {
            debug!("ignoring premove dests on the player's own turn");
            return;
        }
        let now = self.clock.now_ms();
        if dests.is_empty() && self.timers.suppresses_clear(DestKind::Premove, now) {
            debug!("ignoring premove-dests clear inside suppression window");
            return;
        }
        if !dests.is_empty() {
            self.timers.note_dests(DestKind::Premove, now);
        }

        self.premove_dests = dests;
        self.push(PartialState {
            premove_dests: Some(self.premove_dests.clone()),
            legal_dests: Some(DestinationSet::new()),
            ..Default::default()
        });
        self.reapply_premove_highlight();
        self.pump();
    }

    /// `setTurn`.
    pub fn set_turn(&mut self, color: Color) {
        self.view.turn_color = color;
        self.push(PartialState {
            turn_color: Some(color),
            ..Default::default()
        });
        self.reapply();
        self.pump();
    }

    /// `setDraggable`: toggles drag permission and optionally the movable
    /// colour.  Disabling aborts any drag in progress.
    pub fn set_draggable(&mut self, p: SetDraggablePayload) {
        self.view.draggable_enabled = p.enabled;
        if let Some(color) = p.player_color {
            self.view.movable_color = color;
        }
        if !p.enabled {
            self.surface.cancel_move();
        }
        self.push(PartialState {
            draggable: Some(p.enabled),
            movable_color: Some(self.view.movable_color),
            ..Default::default()
        });
        self.reapply();
        self.pump();
    }

    /// `setFreeMode`.
    pub fn set_free_mode(&mut self, free: bool) {
        self.view.free_mode = free;
        self.push(PartialState {
            free: Some(free),
            ..Default::default()
        });
        self.reapply();
        self.pump();
    }

    /// `clearPremoves`: a permitted clearing gesture issued by the host.
    pub fn clear_premoves(&mut self) {
        self.release_premove();
    }

    /// `playPremove`: asks the surface to execute the pending premove now.
    pub fn play_premove(&mut self) {
        let locked = self.lock.committed().is_some();
        if locked {
            self.lock.arm_clearance();
        }
        let played = self.surface.play_premove();
        self.pump();
        if !played && self.lock.is_armed() {
            debug!("no premove to play; disarming clearance");
            self.lock.disarm();
        }
    }

    /// `flip`: swaps the orientation.
    pub fn flip(&mut self) {
        self.view.orientation = self.view.orientation.opposite();
        self.push(PartialState {
            orientation: Some(self.view.orientation),
            ..Default::default()
        });
        self.reapply_premove_highlight();
        self.pump();
    }

    /// `setSize`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidSize`] if either dimension is zero.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CommandError> {
        if width == 0 || height == 0 {
            return Err(CommandError::InvalidSize { width, height });
        }
        self.surface.resize(width, height);
        self.pump();
        Ok(())
    }

    /// Stops and tears down the surface, discarding all reconciler state.
    pub fn teardown(mut self) {
        self.surface.cancel_move();
        self.surface.stop();
        self.surface.teardown();
    }

    // ── User input ────────────────────────────────────────────────────────────

    /// Routes a renderer gesture: premove-clearing gestures are recognised
    /// first, then the surface reacts to the gesture itself.
    pub fn handle_gesture(&mut self, gesture: SurfaceGesture) {
        if let SurfaceGesture::PointerDown { square, button } = &gesture {
            let clears = match (button, self.lock.committed()) {
                (_, None) => false,
                (PointerButton::Secondary, Some(_)) => true,
                (PointerButton::Primary, Some((from, _))) => *square == Some(from),
            };
            if clears {
                debug!("pointer gesture releases the committed premove");
                self.release_premove();
            }
        }
        self.surface.handle_gesture(&gesture);
        self.pump();
    }

    /// Drains and interprets queued surface callbacks.
    pub fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let events = self.surface.take_events();
            if events.is_empty() {
                return;
            }
            for event in events {
                self.on_surface_event(event);
            }
        }
        warn!("surface kept emitting callbacks after {MAX_PUMP_ROUNDS} rounds");
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        let now = self.clock.now_ms();
        match event {
            SurfaceEvent::Move {
                orig,
                dest,
                promotion,
            } => {
                self.selection.clear();
                self.view.last_move = Some((orig, dest));
                self.outbox.push(WidgetEvent::Move {
                    from: orig,
                    to: dest,
                    promotion,
                });
                if self.lock.committed().is_some() {
                    self.release_premove();
                }
            }

            SurfaceEvent::Select(Some(square)) => {
                self.selection = SelectionState {
                    selected: Some(square),
                    selected_at_ms: now,
                };
                self.timers.note_select(now);
                self.outbox.push(WidgetEvent::Select {
                    square: Some(square),
                });
            }

            SurfaceEvent::Select(None) => {
                if self.selection.selected.is_none() {
                    return;
                }
                if self.timers.suppresses_deselect(now) {
                    debug!("suppressing deselect inside selection window");
                    return;
                }
                self.selection.clear();
                self.outbox.push(WidgetEvent::Select { square: None });
            }

            SurfaceEvent::PremoveSet { orig, dest } => match self.lock.on_commit(orig, dest) {
                CommitOutcome::Locked => {
                    self.outbox.push(WidgetEvent::Premove {
                        from: orig,
                        to: dest,
                    });
                }
                CommitOutcome::Unchanged => {}
                CommitOutcome::Rejected { keep } => {
                    self.push(PartialState {
                        premove_current: Some(Some(keep)),
                        ..Default::default()
                    });
                }
            },

            SurfaceEvent::PremoveUnset => match self.lock.on_unset() {
                UnsetOutcome::Released => self.outbox.push(WidgetEvent::PremoveCleared),
                UnsetOutcome::Relock(keep) => {
                    self.push(PartialState {
                        premove_current: Some(Some(keep)),
                        ..Default::default()
                    });
                }
                UnsetOutcome::Ignored => {}
            },
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Performs a permitted premove release.
    ///
    /// Arms clearance, lets the surface drop its premove (whose unset
    /// callback consumes the flag), and finishes the release itself if the
    /// surface had nothing to unset.
    fn release_premove(&mut self) {
        self.lock.arm_clearance();
        self.surface.unset_premove();
        self.pump();
        if self.lock.is_armed() && self.lock.on_unset() == UnsetOutcome::Released {
            self.push(PartialState {
                premove_current: Some(None),
                ..Default::default()
            });
            self.outbox.push(WidgetEvent::PremoveCleared);
        }
    }

    /// Turn-authority rule followed by the premove highlight.
    fn reapply(&mut self) {
        if self.is_on_turn() {
            let legal = self.legal_dests.without_friendly_targets(self.surface.pieces());
            self.push(PartialState {
                legal_dests: Some(legal),
                premove_dests: Some(DestinationSet::new()),
                ..Default::default()
            });
        } else {
            self.push(PartialState {
                premove_dests: Some(self.premove_dests.clone()),
                legal_dests: Some(DestinationSet::new()),
                ..Default::default()
            });
        }
        self.reapply_premove_highlight();
    }

    fn reapply_premove_highlight(&mut self) {
        if let Some(pair) = self.lock.committed() {
            self.push(PartialState {
                premove_current: Some(Some(pair)),
                ..Default::default()
            });
        }
    }

    /// Keeps a fresh selection across a position push on the player's own
    /// turn; otherwise clears it.
    fn restore_or_clear_selection(&mut self) {
        let now = self.clock.now_ms();
        let keep = match self.selection.selected {
            Some(square)
                if self.is_on_turn()
                    && now.saturating_sub(self.selection.selected_at_ms)
                        <= self.selection_persist_ms =>
            {
                Some(square)
            }
            _ => None,
        };
        if keep.is_none() {
            self.selection.clear();
        }
        self.push(PartialState {
            selected: Some(keep),
            ..Default::default()
        });
    }

    fn push_full_state(&mut self) {
        let pieces = PieceMap::from_fen(&self.view.fen).unwrap_or_default();
        self.push(PartialState {
            fen: Some(self.view.fen.clone()),
            pieces: Some(pieces),
            orientation: Some(self.view.orientation),
            turn_color: Some(self.view.turn_color),
            last_move: Some(None),
            check: Some(false),
            movable_color: Some(self.view.movable_color),
            draggable: Some(self.view.draggable_enabled),
            free: Some(self.view.free_mode),
            legal_dests: Some(DestinationSet::new()),
            premove_dests: Some(DestinationSet::new()),
            selected: Some(None),
            premove_current: Some(None),
        });
    }

    fn push(&mut self, state: PartialState) {
        if !state.is_empty() {
            self.surface.apply(state);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::ManualClock;
    use crate::infrastructure::headless::HeadlessSurface;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn dests(pairs: &[(&str, &str)]) -> DestinationSet {
        let mut set = DestinationSet::new();
        for (o, d) in pairs {
            set.insert(sq(o), sq(d));
        }
        set
    }

    fn position(turn: Color) -> SetPositionPayload {
        SetPositionPayload {
            fen: START_FEN.to_string(),
            last_move: None,
            check: None,
            turn_color: Some(turn),
            orientation: None,
        }
    }

    fn board(player: MovableColor) -> (BoardReconciler<HeadlessSurface>, Arc<ManualClock>) {
        let config = SurfaceConfig {
            orientation: Color::White,
            coordinates: true,
            animation_ms: 0,
            block_touch_scroll: true,
            movable_color: player,
            theme: None,
        };
        let clock = Arc::new(ManualClock::new());
        let surface = HeadlessSurface::new(config.clone());
        let board = BoardReconciler::new(surface, &config, &TimingConfig::default(), clock.clone());
        (board, clock)
    }

    /// Black player, white to move, with a locked e7→e5 premove.
    fn board_with_locked_premove() -> BoardReconciler<HeadlessSurface> {
        let (mut b, _) = board(MovableColor::Black);
        b.set_premove_dests(dests(&[("e7", "e5"), ("d7", "d5")]));
        b.handle_gesture(SurfaceGesture::Drag {
            from: sq("e7"),
            to: sq("e5"),
            promotion: None,
        });
        b.drain_events();
        b
    }

    #[test]
    fn test_new_board_shows_start_position() {
        let (b, _) = board(MovableColor::White);
        assert_eq!(b.surface().snapshot().fen, START_FEN);
        assert_eq!(b.surface().pieces().len(), 32);
        assert!(b.is_on_turn());
    }

    #[test]
    fn test_invalid_fen_leaves_surface_untouched() {
        // Arrange
        let (mut b, _) = board(MovableColor::White);
        let before = b.surface().apply_count();
        let mut p = position(Color::White);
        p.fen = "not/a/fen".to_string();

        // Act
        let result = b.set_position(p);

        // Assert
        assert!(matches!(result, Err(CommandError::InvalidFen(_))));
        assert_eq!(b.surface().apply_count(), before);
    }

    #[test]
    fn test_legal_dests_drop_friendly_targets() {
        let (mut b, _) = board(MovableColor::White);

        b.set_legal_dests(dests(&[("g1", "f3"), ("g1", "e2")]));

        let shown = &b.surface().snapshot().legal_dests;
        assert!(shown.contains(sq("g1"), sq("f3")));
        assert!(!shown.contains(sq("g1"), sq("e2")));
    }

    #[test]
    fn test_premove_dests_ignored_on_own_turn() {
        let (mut b, _) = board(MovableColor::White);
        b.set_premove_dests(dests(&[("e2", "e4")]));
        assert!(b.premove_dests().is_empty());
        assert!(b.surface().snapshot().premove_dests.is_empty());
    }

    #[test]
    fn test_turn_change_swaps_visible_destinations() {
        // Arrange: black player waiting, legal dests already known
        let (mut b, _) = board(MovableColor::Black);
        b.set_premove_dests(dests(&[("e7", "e5")]));
        b.set_legal_dests(dests(&[("d7", "d5")]));

        // Act: black to move
        b.set_position(position(Color::Black)).unwrap();

        // Assert
        let snap = b.surface().snapshot();
        assert!(snap.legal_dests.contains(sq("d7"), sq("d5")));
        assert!(snap.premove_dests.is_empty());

        // And back to white: premove dots reappear, legal dots vanish
        b.set_turn(Color::White);
        let snap = b.surface().snapshot();
        assert!(snap.legal_dests.is_empty());
        assert!(snap.premove_dests.contains(sq("e7"), sq("e5")));
    }

    #[test]
    fn test_legal_dests_off_turn_are_stored_not_shown() {
        // Arrange: black player, white to move, premove dots visible
        let (mut b, _) = board(MovableColor::Black);
        b.set_premove_dests(dests(&[("e7", "e5")]));

        // Act
        b.set_legal_dests(dests(&[("d7", "d5")]));

        // Assert
        let snap = b.surface().snapshot();
        assert!(snap.legal_dests.is_empty());
        assert!(snap.premove_dests.contains(sq("e7"), sq("e5")));
        assert!(b.legal_dests().contains(sq("d7"), sq("d5")));
    }

    #[test]
    fn test_empty_legal_dests_off_turn_keep_premove_dots() {
        // Arrange
        let (mut b, clock) = board(MovableColor::Black);
        b.set_premove_dests(dests(&[("e7", "e5")]));
        clock.advance(500);

        // Act
        b.set_legal_dests(DestinationSet::new());

        // Assert: one set is still showing
        let snap = b.surface().snapshot();
        assert!(snap.legal_dests.is_empty());
        assert!(snap.premove_dests.contains(sq("e7"), sq("e5")));
    }

    #[test]
    fn test_committing_premove_locks_and_notifies() {
        let (mut b, _) = board(MovableColor::Black);
        b.set_premove_dests(dests(&[("e7", "e5")]));

        b.handle_gesture(SurfaceGesture::Drag {
            from: sq("e7"),
            to: sq("e5"),
            promotion: None,
        });

        assert_eq!(
            b.drain_events(),
            vec![WidgetEvent::Premove {
                from: sq("e7"),
                to: sq("e5")
            }]
        );
        assert_eq!(b.premove_lock().committed(), Some((sq("e7"), sq("e5"))));
    }

    #[test]
    fn test_premove_survives_position_push() {
        // Arrange
        let mut b = board_with_locked_premove();

        // Act: the host pushes the same position again (surface drops its premove)
        b.set_position(position(Color::White)).unwrap();

        // Assert
        assert_eq!(
            b.surface().snapshot().premove_current,
            Some((sq("e7"), sq("e5")))
        );
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn test_second_premove_is_rejected_every_time() {
        let mut b = board_with_locked_premove();

        for _ in 0..3 {
            b.handle_gesture(SurfaceGesture::Drag {
                from: sq("d7"),
                to: sq("d5"),
                promotion: None,
            });
            assert_eq!(
                b.surface().snapshot().premove_current,
                Some((sq("e7"), sq("e5")))
            );
        }
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn test_accidental_unset_is_reverted() {
        let mut b = board_with_locked_premove();

        b.surface_mut().inject_event(SurfaceEvent::PremoveUnset);
        b.pump();

        assert_eq!(
            b.surface().snapshot().premove_current,
            Some((sq("e7"), sq("e5")))
        );
        assert!(b.premove_lock().committed().is_some());
    }

    #[test]
    fn test_secondary_click_releases_premove() {
        let mut b = board_with_locked_premove();

        b.handle_gesture(SurfaceGesture::PointerDown {
            square: None,
            button: PointerButton::Secondary,
        });

        assert_eq!(b.drain_events(), vec![WidgetEvent::PremoveCleared]);
        assert_eq!(b.surface().snapshot().premove_current, None);
        assert!(!b.premove_lock().is_armed());
    }

    #[test]
    fn test_click_on_premove_origin_releases_premove() {
        let mut b = board_with_locked_premove();

        b.handle_gesture(SurfaceGesture::PointerDown {
            square: Some(sq("e7")),
            button: PointerButton::Primary,
        });

        let events = b.drain_events();
        assert_eq!(events.first(), Some(&WidgetEvent::PremoveCleared));
        assert!(b.premove_lock().committed().is_none());
    }

    #[test]
    fn test_click_elsewhere_keeps_premove() {
        let mut b = board_with_locked_premove();

        b.handle_gesture(SurfaceGesture::PointerDown {
            square: Some(sq("a4")),
            button: PointerButton::Primary,
        });

        assert!(b.premove_lock().committed().is_some());
        assert!(!b.drain_events().contains(&WidgetEvent::PremoveCleared));
    }

    #[test]
    fn test_clear_premoves_without_lock_is_quiet() {
        let (mut b, _) = board(MovableColor::Black);
        b.clear_premoves();
        assert!(b.drain_events().is_empty());
        assert!(!b.premove_lock().is_armed());
    }

    #[test]
    fn test_clear_premoves_releases_lock() {
        let mut b = board_with_locked_premove();
        b.clear_premoves();
        assert_eq!(b.drain_events(), vec![WidgetEvent::PremoveCleared]);
    }

    #[test]
    fn test_play_premove_executes_when_legal() {
        // Arrange: black to move, e7e5 now legal
        let mut b = board_with_locked_premove();
        b.set_legal_dests(dests(&[("e7", "e5")]));
        b.set_turn(Color::Black);
        b.drain_events();

        // Act
        b.play_premove();

        // Assert
        assert_eq!(
            b.drain_events(),
            vec![
                WidgetEvent::PremoveCleared,
                WidgetEvent::Move {
                    from: sq("e7"),
                    to: sq("e5"),
                    promotion: None
                }
            ]
        );
        assert!(b.premove_lock().committed().is_none());
    }

    #[test]
    fn test_play_premove_without_premove_disarms() {
        let (mut b, _) = board(MovableColor::White);
        b.play_premove();
        assert!(!b.premove_lock().is_armed());
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn test_deselect_inside_window_is_suppressed() {
        // Arrange
        let (mut b, clock) = board(MovableColor::White);
        b.handle_gesture(SurfaceGesture::Select { square: sq("g1") });
        assert_eq!(
            b.drain_events(),
            vec![WidgetEvent::Select {
                square: Some(sq("g1"))
            }]
        );

        // Act
        clock.advance(150);
        b.handle_gesture(SurfaceGesture::Deselect);

        // Assert
        assert!(b.drain_events().is_empty());
        assert_eq!(b.selection().selected, Some(sq("g1")));
    }

    #[test]
    fn test_deselect_at_window_edge_is_forwarded() {
        let (mut b, clock) = board(MovableColor::White);
        b.handle_gesture(SurfaceGesture::Select { square: sq("g1") });
        b.drain_events();

        clock.advance(200);
        b.handle_gesture(SurfaceGesture::Deselect);

        assert_eq!(b.drain_events(), vec![WidgetEvent::Select { square: None }]);
        assert_eq!(b.selection().selected, None);
    }

    #[test]
    fn test_fresh_selection_survives_position_push_on_turn() {
        let (mut b, clock) = board(MovableColor::White);
        b.handle_gesture(SurfaceGesture::Select { square: sq("g1") });

        clock.advance(500);
        b.set_position(position(Color::White)).unwrap();
        assert_eq!(b.surface().snapshot().selected, Some(sq("g1")));

        clock.advance(900);
        b.set_position(position(Color::White)).unwrap();
        assert_eq!(b.surface().snapshot().selected, None);
        assert_eq!(b.selection().selected, None);
    }

    #[test]
    fn test_selection_cleared_when_turn_passes() {
        let (mut b, _) = board(MovableColor::White);
        b.handle_gesture(SurfaceGesture::Select { square: sq("g1") });

        b.set_position(position(Color::Black)).unwrap();

        assert_eq!(b.surface().snapshot().selected, None);
    }

    #[test]
    fn test_empty_dests_inside_window_are_ignored() {
        // Arrange
        let (mut b, clock) = board(MovableColor::White);
        b.set_legal_dests(dests(&[("g1", "f3")]));

        // Act / Assert: a clear 100 ms later is swallowed
        clock.advance(100);
        b.set_legal_dests(DestinationSet::new());
        assert!(!b.surface().snapshot().legal_dests.is_empty());

        // ... but one 200 ms after the push goes through
        clock.advance(100);
        b.set_legal_dests(DestinationSet::new());
        assert!(b.surface().snapshot().legal_dests.is_empty());
    }

    #[test]
    fn test_disabling_drag_cancels_move_in_flight() {
        let (mut b, _) = board(MovableColor::White);
        b.set_draggable(SetDraggablePayload {
            enabled: false,
            player_color: None,
        });
        assert_eq!(b.surface().cancelled_moves(), 1);
        assert!(!b.surface().snapshot().draggable);
    }

    #[test]
    fn test_set_draggable_can_change_player_colour() {
        let (mut b, _) = board(MovableColor::White);
        b.set_draggable(SetDraggablePayload {
            enabled: true,
            player_color: Some(MovableColor::Black),
        });
        assert!(!b.is_on_turn());
        assert_eq!(b.surface().snapshot().movable_color, MovableColor::Black);
    }

    #[test]
    fn test_both_colours_is_never_on_turn() {
        let (b, _) = board(MovableColor::Both);
        assert!(!b.is_on_turn());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let (mut b, _) = board(MovableColor::White);
        assert!(matches!(
            b.resize(0, 400),
            Err(CommandError::InvalidSize {
                width: 0,
                height: 400
            })
        ));
        b.resize(480, 480).unwrap();
        assert_eq!(b.surface().snapshot().size, Some((480, 480)));
    }

    #[test]
    fn test_flip_keeps_premove_highlight() {
        let mut b = board_with_locked_premove();
        b.flip();
        let snap = b.surface().snapshot();
        assert_eq!(snap.orientation, Color::Black);
        assert_eq!(snap.premove_current, Some((sq("e7"), sq("e5"))));
    }
}
