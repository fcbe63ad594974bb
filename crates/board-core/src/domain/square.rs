//! Board coordinates and player colours.
//!
//! A [`Square`] is a file/rank pair on the standard 8×8 grid, written in
//! algebraic form (`"a1"` … `"h8"`).  The host and the rendering surface both
//! address squares by that string key, so `Square` serializes to and from it
//! directly.
//!
//! # Why not just use `String`? (for beginners)
//!
//! A plain string would accept `"z9"` or `"hello"` and every consumer would
//! have to re-validate it.  Parsing once at the protocol boundary into a
//! two-byte `Copy` type means the reconciler can compare and hash squares
//! freely and never sees an invalid coordinate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a square key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SquareError {
    /// The key was not exactly two characters long.
    #[error("invalid square key length: {0:?}")]
    BadLength(String),

    /// The file letter was outside `a..=h`.
    #[error("invalid file in square key: {0:?}")]
    BadFile(String),

    /// The rank digit was outside `1..=8`.
    #[error("invalid rank in square key: {0:?}")]
    BadRank(String),
}

// ── Square ────────────────────────────────────────────────────────────────────

/// A single square on the board.
///
/// `file` and `rank` are zero-based: `a1` is `(0, 0)` and `h8` is `(7, 7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Builds a square from zero-based file and rank indices.
    ///
    /// Returns `None` when either index is outside `0..8`.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Self { file, rank })
    }

    /// Zero-based file index (`a` = 0).
    pub fn file(self) -> u8 {
        self.file
    }

    /// Zero-based rank index (`1` = 0).
    pub fn rank(self) -> u8 {
        self.rank
    }
}

impl FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(SquareError::BadLength(s.to_string()));
        }
        let file = match bytes[0] {
            b @ b'a'..=b'h' => b - b'a',
            _ => return Err(SquareError::BadFile(s.to_string())),
        };
        let rank = match bytes[1] {
            b @ b'1'..=b'8' => b - b'1',
            _ => return Err(SquareError::BadRank(s.to_string())),
        };
        Ok(Self { file, rank })
    }
}

impl TryFrom<String> for Square {
    type Error = SquareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> Self {
        sq.to_string()
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

// ── Colours ───────────────────────────────────────────────────────────────────

/// One side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Returns the other side.
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::White => "white",
            Color::Black => "black",
        })
    }
}

/// Which side the local user may move.
///
/// `Both` is used for analysis boards and free mode; it never counts as
/// "on turn" for the purpose of choosing legal versus premove destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovableColor {
    White,
    Black,
    Both,
}

impl MovableColor {
    /// Returns the concrete colour, or `None` for [`MovableColor::Both`].
    pub fn concrete(self) -> Option<Color> {
        match self {
            MovableColor::White => Some(Color::White),
            MovableColor::Black => Some(Color::Black),
            MovableColor::Both => None,
        }
    }
}

impl From<Color> for MovableColor {
    fn from(c: Color) -> Self {
        match c {
            Color::White => MovableColor::White,
            Color::Black => MovableColor::Black,
        }
    }
}

/// Piece a pawn promotes to, carried on outbound `move` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Promotion {
    #[serde(rename = "q")]
    Queen,
    #[serde(rename = "r")]
    Rook,
    #[serde(rename = "b")]
    Bishop,
    #[serde(rename = "n")]
    Knight,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corner_squares() {
        assert_eq!("a1".parse::<Square>().unwrap(), Square::new(0, 0).unwrap());
        assert_eq!("h8".parse::<Square>().unwrap(), Square::new(7, 7).unwrap());
    }

    #[test]
    fn test_display_matches_algebraic_key() {
        let sq: Square = "e4".parse().unwrap();
        assert_eq!(sq.to_string(), "e4");
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.rank(), 3);
    }

    #[test]
    fn test_parse_rejects_out_of_range_file() {
        assert_eq!(
            "i1".parse::<Square>(),
            Err(SquareError::BadFile("i1".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_rank() {
        assert_eq!(
            "a9".parse::<Square>(),
            Err(SquareError::BadRank("a9".to_string()))
        );
        assert!("a0".parse::<Square>().is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("e".parse::<Square>().is_err());
        assert!("e22".parse::<Square>().is_err());
        assert!("".parse::<Square>().is_err());
    }

    #[test]
    fn test_square_serde_uses_string_key() {
        let sq: Square = "g7".parse().unwrap();
        assert_eq!(serde_json::to_string(&sq).unwrap(), "\"g7\"");
        let back: Square = serde_json::from_str("\"g7\"").unwrap();
        assert_eq!(back, sq);
        assert!(serde_json::from_str::<Square>("\"x7\"").is_err());
    }

    #[test]
    fn test_new_rejects_indices_outside_board() {
        assert!(Square::new(8, 0).is_none());
        assert!(Square::new(0, 8).is_none());
    }

    #[test]
    fn test_color_opposite() {
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite(), Color::White);
    }

    #[test]
    fn test_movable_color_both_has_no_concrete_colour() {
        assert_eq!(MovableColor::Both.concrete(), None);
        assert_eq!(MovableColor::White.concrete(), Some(Color::White));
    }

    #[test]
    fn test_colour_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Color::Black).unwrap(), "\"black\"");
        let m: MovableColor = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(m, MovableColor::Both);
    }

    #[test]
    fn test_promotion_serializes_as_piece_letter() {
        assert_eq!(serde_json::to_string(&Promotion::Knight).unwrap(), "\"n\"");
    }
}
