//! # board-core
//!
//! Shared library for the embedded board widget containing the frame
//! message protocol (envelope codec, origin guard, typed commands and
//! events) and the board domain types the reconciler works with.
//!
//! It has zero dependencies on async runtimes, sockets, or rendering.
//!
//! # Architecture overview (for beginners)
//!
//! The widget lives inside a sandboxed frame.  The page that embeds it (the
//! "host") pushes game state in; the widget reports what the user does on
//! the board back out.  Both directions use the same small JSON envelope.
//!
//! This crate (`board-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How messages travel between host and widget: the
//!   versioned envelope, trust-on-first-use origin locking, and the typed
//!   command/event vocabulary.
//!
//! - **`domain`** – Pure value types: squares, colours, destination sets and
//!   the piece map parsed from a FEN placement.  No chess rules live here;
//!   the host owns legality.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `board_core::Square` instead of `board_core::domain::square::Square`.
pub use domain::{Color, DestinationSet, MovableColor, Piece, PieceMap, Promotion, Role, Square};
pub use protocol::envelope::{decode_envelope, encode_envelope, Envelope, EnvelopeError};
pub use protocol::messages::{CommandKind, HostCommand, WidgetEvent};
pub use protocol::origin::{OriginGuard, TrustedOrigin};
