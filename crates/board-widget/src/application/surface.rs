//! The rendering-surface contract the reconciler drives.
//!
//! The surface is whatever actually paints the board: a canvas in a
//! browser, a terminal renderer, or the in-memory
//! [`HeadlessSurface`](crate::infrastructure::headless::HeadlessSurface)
//! used by tests and the bridge binary.  The reconciler treats it as an
//! opaque stateful object with three properties that shape everything
//! about how it is driven:
//!
//! 1. **Replace semantics.**  [`RenderingSurface::apply`] replaces every
//!    sub-state a [`PartialState`] mentions.  Pushing a position with no
//!    destinations does not keep the old dots; it leaves whatever the
//!    surface does with a fresh render.  The reconciler therefore re-pushes
//!    derived state after every mutation.
//! 2. **Callbacks are queued.**  User interaction and some internal updates
//!    produce [`SurfaceEvent`]s.  The surface buffers them and the
//!    reconciler collects them with [`RenderingSurface::take_events`]
//!    inside the same synchronous handler that caused them.
//! 3. **Exclusive ownership.**  Only the reconciler holds the surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use board_core::domain::{Color, DestinationSet, MovableColor, PieceMap, Promotion, Square};

/// An `(origin, destination)` pair: a last move or a committed premove.
pub type MovePair = (Square, Square);

// ── Construction ──────────────────────────────────────────────────────────────

/// Options a surface is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConfig {
    pub orientation: Color,
    pub coordinates: bool,
    pub animation_ms: u32,
    pub block_touch_scroll: bool,
    pub movable_color: MovableColor,
    /// Opaque theme description forwarded from `init`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,
}

/// Builds surfaces.  Called on every `init` (and by the fallback timer).
pub trait SurfaceFactory: Send {
    type Surface: RenderingSurface;

    /// Constructs a new surface in its container with `config`.
    fn configure(&mut self, config: &SurfaceConfig) -> Self::Surface;
}

// ── Updates ───────────────────────────────────────────────────────────────────

/// A partial update.  Every `Some` field replaces that sub-state wholesale.
///
/// Fields that can be *cleared* are `Option<Option<_>>`: the outer `Some`
/// means "touch this sub-state", the inner `None` means "clear it".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    /// Parsed placement matching `fen`; local to the process.
    #[serde(skip)]
    pub pieces: Option<PieceMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<Option<MovePair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movable_color: Option<MovableColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_dests: Option<DestinationSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premove_dests: Option<DestinationSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<Option<Square>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premove_current: Option<Option<MovePair>>,
}

impl PartialState {
    /// `true` if the update touches nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Callbacks ─────────────────────────────────────────────────────────────────

/// Callbacks a surface emits.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A move was completed on the board.
    Move {
        orig: Square,
        dest: Square,
        promotion: Option<Promotion>,
    },
    /// A square was selected, or the selection was dropped (`None`).
    Select(Option<Square>),
    /// The surface committed a premove.
    PremoveSet { orig: Square, dest: Square },
    /// The surface dropped its premove, for whatever reason.
    PremoveUnset,
}

/// Which pointer button went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Raw user input reported by a renderer, before the surface reacts to it.
///
/// The reconciler sees every gesture first so that it can recognise the
/// premove-clearing ones, then forwards it to the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceGesture {
    /// A pointer went down, optionally over a square.
    PointerDown {
        #[serde(default)]
        square: Option<Square>,
        button: PointerButton,
    },
    /// A drag (or click-click) from one square to another.
    Drag {
        from: Square,
        to: Square,
        #[serde(default)]
        promotion: Option<Promotion>,
    },
    /// The user picked a square.
    Select { square: Square },
    /// The user dropped the selection.
    Deselect,
}

// ── The contract ──────────────────────────────────────────────────────────────

/// Narrow interface over a stateful board renderer.
pub trait RenderingSurface: Send {
    /// Applies a partial update with replace semantics.
    fn apply(&mut self, state: PartialState);

    /// The surface's own view of piece placement.
    fn pieces(&self) -> &PieceMap;

    /// Lets the surface react to user input (select, move, premove, ...).
    fn handle_gesture(&mut self, gesture: &SurfaceGesture);

    /// Drops the surface's current premove.  Emits
    /// [`SurfaceEvent::PremoveUnset`] if one existed.
    fn unset_premove(&mut self);

    /// Executes the current premove if it is playable now.
    ///
    /// Returns `true` when a move was played.
    fn play_premove(&mut self) -> bool;

    /// Aborts an in-flight drag.
    fn cancel_move(&mut self);

    /// Stops animations and input handling.
    fn stop(&mut self);

    /// Resizes the container, in CSS pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Releases everything; the surface is unusable afterwards.
    fn teardown(&mut self);

    /// Removes and returns queued callbacks, oldest first.
    fn take_events(&mut self) -> Vec<SurfaceEvent>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
