//! Board domain types.
//!
//! Pure value types with no I/O: squares, colours, destination sets and the
//! structural piece map derived from a FEN placement.  Nothing in this layer
//! knows chess rules; legality is decided by the host page.

pub mod dests;
pub mod fen;
pub mod square;

pub use dests::DestinationSet;
pub use fen::{FenError, Piece, PieceMap, Role};
pub use square::{Color, MovableColor, Promotion, Square, SquareError};
