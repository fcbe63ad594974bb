//! In-memory rendering surface.
//!
//! [`HeadlessSurface`] keeps the full board state a real renderer would
//! draw and reacts to gestures the way an interactive board does: clicks
//! select and move pieces, moves off turn become premoves, and a position
//! or turn change drops the current premove.  It is used by the unit and
//! integration tests and by the `board-widget` binary, which mirrors every
//! applied [`PartialState`] to connected renderers.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use board_core::domain::{Color, DestinationSet, MovableColor, PieceMap, Promotion, Square};

use crate::application::surface::{
    MovePair, PartialState, PointerButton, RenderingSurface, SurfaceConfig, SurfaceEvent,
    SurfaceFactory, SurfaceGesture,
};

/// Everything the surface currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub fen: String,
    pub orientation: Color,
    pub turn_color: Color,
    pub last_move: Option<MovePair>,
    pub check: bool,
    pub movable_color: MovableColor,
    pub draggable: bool,
    pub free: bool,
    pub legal_dests: DestinationSet,
    pub premove_dests: DestinationSet,
    pub selected: Option<Square>,
    pub premove_current: Option<MovePair>,
    pub size: Option<(u32, u32)>,
}

/// A lifecycle call received by a surface, in the order it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCall {
    CancelMove,
    Stop,
    Teardown,
}

/// Lifecycle calls shared between a factory and every surface it built.
type LifecycleLog = Arc<Mutex<Vec<LifecycleCall>>>;

/// A surface with no pixels.
pub struct HeadlessSurface {
    config: SurfaceConfig,
    snapshot: SurfaceSnapshot,
    pieces: PieceMap,
    events: Vec<SurfaceEvent>,
    mirror: Option<UnboundedSender<PartialState>>,
    apply_count: usize,
    lifecycle: LifecycleLog,
}

impl HeadlessSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        let snapshot = SurfaceSnapshot {
            fen: String::new(),
            orientation: config.orientation,
            turn_color: Color::White,
            last_move: None,
            check: false,
            movable_color: config.movable_color,
            draggable: true,
            free: false,
            legal_dests: DestinationSet::new(),
            premove_dests: DestinationSet::new(),
            selected: None,
            premove_current: None,
            size: None,
        };
        Self {
            config,
            snapshot,
            pieces: PieceMap::new(),
            events: Vec::new(),
            mirror: None,
            apply_count: 0,
            lifecycle: LifecycleLog::default(),
        }
    }

    /// Forwards every applied update to `tx`.
    pub fn with_mirror(mut self, tx: UnboundedSender<PartialState>) -> Self {
        self.mirror = Some(tx);
        self
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &SurfaceSnapshot {
        &self.snapshot
    }

    /// Number of [`RenderingSurface::apply`] calls so far.
    pub fn apply_count(&self) -> usize {
        self.apply_count
    }

    pub fn cancelled_moves(&self) -> usize {
        self.lifecycle()
            .iter()
            .filter(|c| **c == LifecycleCall::CancelMove)
            .count()
    }

    /// Lifecycle calls recorded so far.
    pub fn lifecycle(&self) -> Vec<LifecycleCall> {
        self.lifecycle.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn record(&self, call: LifecycleCall) {
        if let Ok(mut log) = self.lifecycle.lock() {
            log.push(call);
        }
    }

    /// Queues a callback as if the surface had produced it internally.
    pub fn inject_event(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }

    // ── Interaction rules ─────────────────────────────────────────────────────

    fn piece_is_controlled(&self, square: Square) -> bool {
        let Some(piece) = self.pieces.get(square) else {
            return false;
        };
        match self.snapshot.movable_color {
            MovableColor::Both => true,
            MovableColor::White => piece.color == Color::White,
            MovableColor::Black => piece.color == Color::Black,
        }
    }

    fn can_move(&self, orig: Square, dest: Square) -> bool {
        if !self.snapshot.draggable || orig == dest || !self.piece_is_controlled(orig) {
            return false;
        }
        if self.snapshot.free {
            return true;
        }
        let on_turn = self
            .pieces
            .get(orig)
            .is_some_and(|p| p.color == self.snapshot.turn_color);
        on_turn && self.snapshot.legal_dests.contains(orig, dest)
    }

    fn can_premove(&self, orig: Square, dest: Square) -> bool {
        if !self.snapshot.draggable || self.snapshot.free || orig == dest {
            return false;
        }
        let Some(player) = self.snapshot.movable_color.concrete() else {
            return false;
        };
        let own_piece = self.pieces.get(orig).is_some_and(|p| p.color == player);
        own_piece
            && player != self.snapshot.turn_color
            && self.snapshot.premove_dests.contains(orig, dest)
    }

    fn user_move(&mut self, orig: Square, dest: Square, promotion: Option<Promotion>) {
        if self.can_move(orig, dest) {
            self.snapshot.selected = None;
            self.relocate(orig, dest);
            self.events.push(SurfaceEvent::Move {
                orig,
                dest,
                promotion,
            });
        } else if self.can_premove(orig, dest) {
            self.snapshot.selected = None;
            self.snapshot.premove_current = Some((orig, dest));
            self.events.push(SurfaceEvent::PremoveSet { orig, dest });
        } else {
            self.deselect();
        }
    }

    fn relocate(&mut self, orig: Square, dest: Square) {
        self.pieces.relocate(orig, dest);
        self.snapshot.last_move = Some((orig, dest));
        self.snapshot.legal_dests = DestinationSet::new();
        self.snapshot.turn_color = self.snapshot.turn_color.opposite();
    }

    fn select(&mut self, square: Square) {
        if self.snapshot.selected == Some(square) {
            return;
        }
        self.snapshot.selected = Some(square);
        self.events.push(SurfaceEvent::Select(Some(square)));
    }

    fn deselect(&mut self) {
        if self.snapshot.selected.take().is_some() {
            self.events.push(SurfaceEvent::Select(None));
        }
    }

    fn drop_premove(&mut self) {
        if self.snapshot.premove_current.take().is_some() {
            self.events.push(SurfaceEvent::PremoveUnset);
        }
    }

    fn on_pointer_down(&mut self, square: Option<Square>, button: PointerButton) {
        if button == PointerButton::Secondary {
            self.drop_premove();
            self.deselect();
            return;
        }
        let Some(square) = square else {
            self.deselect();
            return;
        };
        let selected = self.snapshot.selected;
        match selected {
            Some(current) if current == square => self.deselect(),
            Some(current) if self.can_move(current, square) || self.can_premove(current, square) => {
                self.user_move(current, square, None)
            }
            _ if self.piece_is_controlled(square) => self.select(square),
            _ => self.deselect(),
        }
    }
}

impl RenderingSurface for HeadlessSurface {
    fn apply(&mut self, state: PartialState) {
        self.apply_count += 1;
        if let Some(tx) = &self.mirror {
            // A closed mirror only means no renderer is listening.
            let _ = tx.send(state.clone());
        }

        let position_changed = state.fen.is_some() || state.turn_color.is_some();
        let premove_touched = state.premove_current.is_some();

        if let Some(fen) = state.fen {
            self.pieces = match state.pieces {
                Some(pieces) => pieces,
                None => PieceMap::from_fen(&fen).unwrap_or_default(),
            };
            self.snapshot.fen = fen;
        }
        if let Some(orientation) = state.orientation {
            self.snapshot.orientation = orientation;
        }
        if let Some(turn) = state.turn_color {
            self.snapshot.turn_color = turn;
        }
        if let Some(last_move) = state.last_move {
            self.snapshot.last_move = last_move;
        }
        if let Some(check) = state.check {
            self.snapshot.check = check;
        }
        if let Some(color) = state.movable_color {
            self.snapshot.movable_color = color;
        }
        if let Some(draggable) = state.draggable {
            self.snapshot.draggable = draggable;
        }
        if let Some(free) = state.free {
            self.snapshot.free = free;
        }
        if let Some(dests) = state.legal_dests {
            self.snapshot.legal_dests = dests;
        }
        if let Some(dests) = state.premove_dests {
            self.snapshot.premove_dests = dests;
        }
        if let Some(selected) = state.selected {
            self.snapshot.selected = selected;
        }

        if let Some(premove) = state.premove_current {
            self.snapshot.premove_current = premove;
        } else if position_changed && !premove_touched {
            trace!("position update drops the current premove");
            self.drop_premove();
        }
    }

    fn pieces(&self) -> &PieceMap {
        &self.pieces
    }

    fn handle_gesture(&mut self, gesture: &SurfaceGesture) {
        match *gesture {
            SurfaceGesture::PointerDown { square, button } => self.on_pointer_down(square, button),
            SurfaceGesture::Drag {
                from,
                to,
                promotion,
            } => self.user_move(from, to, promotion),
            SurfaceGesture::Select { square } => {
                if self.piece_is_controlled(square) {
                    self.select(square);
                }
            }
            SurfaceGesture::Deselect => self.deselect(),
        }
    }

    fn unset_premove(&mut self) {
        self.drop_premove();
    }

    fn play_premove(&mut self) -> bool {
        let Some((orig, dest)) = self.snapshot.premove_current else {
            return false;
        };
        self.drop_premove();
        if self.can_move(orig, dest) {
            self.relocate(orig, dest);
            self.events.push(SurfaceEvent::Move {
                orig,
                dest,
                promotion: None,
            });
            true
        } else {
            false
        }
    }

    fn cancel_move(&mut self) {
        self.record(LifecycleCall::CancelMove);
    }

    fn stop(&mut self) {
        self.record(LifecycleCall::Stop);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.snapshot.size = Some((width, height));
    }

    fn teardown(&mut self) {
        self.record(LifecycleCall::Teardown);
        self.mirror = None;
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Builds [`HeadlessSurface`]s, optionally wired to a renderer mirror.
#[derive(Default)]
pub struct HeadlessSurfaceFactory {
    mirror: Option<UnboundedSender<PartialState>>,
    built: usize,
    lifecycle: LifecycleLog,
}

impl HeadlessSurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mirror(tx: UnboundedSender<PartialState>) -> Self {
        Self {
            mirror: Some(tx),
            ..Self::default()
        }
    }

    /// How many surfaces this factory has constructed.
    pub fn built(&self) -> usize {
        self.built
    }

    /// Lifecycle calls received by all surfaces this factory built.
    pub fn lifecycle(&self) -> Vec<LifecycleCall> {
        self.lifecycle.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    type Surface = HeadlessSurface;

    fn configure(&mut self, config: &SurfaceConfig) -> HeadlessSurface {
        self.built += 1;
        let mut surface = HeadlessSurface::new(config.clone());
        surface.lifecycle = Arc::clone(&self.lifecycle);
        match &self.mirror {
            Some(tx) => surface.with_mirror(tx.clone()),
            None => surface,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn config(movable: MovableColor) -> SurfaceConfig {
        SurfaceConfig {
            orientation: Color::White,
            coordinates: true,
            animation_ms: 0,
            block_touch_scroll: true,
            movable_color: movable,
            theme: None,
        }
    }

    fn dests(pairs: &[(&str, &str)]) -> DestinationSet {
        let mut set = DestinationSet::new();
        for (o, d) in pairs {
            set.insert(sq(o), sq(d));
        }
        set
    }

    fn surface_at_start(movable: MovableColor) -> HeadlessSurface {
        let mut s = HeadlessSurface::new(config(movable));
        s.apply(PartialState {
            fen: Some(START.to_string()),
            ..Default::default()
        });
        s
    }

    #[test]
    fn test_legal_drag_emits_move_and_relocates() {
        // Arrange
        let mut s = surface_at_start(MovableColor::White);
        s.apply(PartialState {
            legal_dests: Some(dests(&[("e2", "e4")])),
            ..Default::default()
        });

        // Act
        s.handle_gesture(&SurfaceGesture::Drag {
            from: sq("e2"),
            to: sq("e4"),
            promotion: None,
        });

        // Assert
        assert_eq!(
            s.take_events(),
            vec![SurfaceEvent::Move {
                orig: sq("e2"),
                dest: sq("e4"),
                promotion: None
            }]
        );
        assert!(s.pieces().get(sq("e4")).is_some());
        assert!(s.pieces().get(sq("e2")).is_none());
    }

    #[test]
    fn test_off_turn_drag_becomes_premove() {
        let mut s = surface_at_start(MovableColor::Black);
        s.apply(PartialState {
            premove_dests: Some(dests(&[("e7", "e5")])),
            ..Default::default()
        });

        s.handle_gesture(&SurfaceGesture::Drag {
            from: sq("e7"),
            to: sq("e5"),
            promotion: None,
        });

        assert_eq!(
            s.take_events(),
            vec![SurfaceEvent::PremoveSet {
                orig: sq("e7"),
                dest: sq("e5")
            }]
        );
        assert_eq!(s.snapshot().premove_current, Some((sq("e7"), sq("e5"))));
    }

    #[test]
    fn test_position_change_drops_premove() {
        let mut s = surface_at_start(MovableColor::Black);
        s.apply(PartialState {
            premove_current: Some(Some((sq("e7"), sq("e5")))),
            ..Default::default()
        });

        s.apply(PartialState {
            fen: Some(START.to_string()),
            ..Default::default()
        });

        assert_eq!(s.take_events(), vec![SurfaceEvent::PremoveUnset]);
        assert_eq!(s.snapshot().premove_current, None);
    }

    #[test]
    fn test_click_select_then_click_again_deselects() {
        let mut s = surface_at_start(MovableColor::White);
        let down = SurfaceGesture::PointerDown {
            square: Some(sq("g1")),
            button: PointerButton::Primary,
        };

        s.handle_gesture(&down);
        s.handle_gesture(&down);

        assert_eq!(
            s.take_events(),
            vec![
                SurfaceEvent::Select(Some(sq("g1"))),
                SurfaceEvent::Select(None)
            ]
        );
    }

    #[test]
    fn test_play_premove_unsets_then_moves_when_legal() {
        // Arrange: premove e7e5 stored, now black to move with e7e5 legal
        let mut s = surface_at_start(MovableColor::Black);
        s.apply(PartialState {
            turn_color: Some(Color::Black),
            legal_dests: Some(dests(&[("e7", "e5")])),
            premove_current: Some(Some((sq("e7"), sq("e5")))),
            ..Default::default()
        });

        // Act
        let played = s.play_premove();

        // Assert
        assert!(played);
        assert_eq!(
            s.take_events(),
            vec![
                SurfaceEvent::PremoveUnset,
                SurfaceEvent::Move {
                    orig: sq("e7"),
                    dest: sq("e5"),
                    promotion: None
                }
            ]
        );
    }

    #[test]
    fn test_play_premove_without_premove_is_noop() {
        let mut s = surface_at_start(MovableColor::White);
        assert!(!s.play_premove());
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_mirror_receives_applied_states() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut factory = HeadlessSurfaceFactory::with_mirror(tx);
        let mut s = factory.configure(&config(MovableColor::Both));

        s.apply(PartialState {
            check: Some(true),
            ..Default::default()
        });

        assert_eq!(rx.try_recv().unwrap().check, Some(true));
        assert_eq!(factory.built(), 1);
    }

    #[test]
    fn test_factory_records_lifecycle_of_built_surfaces() {
        // Arrange
        let mut factory = HeadlessSurfaceFactory::new();
        let mut s = factory.configure(&config(MovableColor::White));

        // Act
        s.cancel_move();
        s.stop();
        s.teardown();

        // Assert
        let expected = vec![
            LifecycleCall::CancelMove,
            LifecycleCall::Stop,
            LifecycleCall::Teardown,
        ];
        assert_eq!(factory.lifecycle(), expected);
        assert_eq!(s.lifecycle(), expected);
        assert_eq!(s.cancelled_moves(), 1);
    }
}
