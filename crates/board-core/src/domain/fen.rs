//! Structural parsing of the FEN piece-placement field.
//!
//! Only the first space-separated field of a FEN string is interpreted: it
//! tells us which piece stands on which square.  Side to move, castling
//! rights and move counters are the host's business, so they are accepted
//! but ignored.  Nothing here knows chess rules; a placement with three
//! kings parses just fine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::square::{Color, Square};

/// Errors produced while parsing a placement field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    /// The placement did not contain exactly eight ranks.
    #[error("placement must have 8 ranks, found {0}")]
    RankCount(usize),

    /// A rank described more or fewer than eight files.
    #[error("rank {rank} describes {files} files")]
    FileCount { rank: u8, files: usize },

    /// A character was neither a piece letter nor a digit `1..=8`.
    #[error("unexpected character {0:?} in placement")]
    BadChar(char),
}

/// Piece kind, without colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// A coloured piece standing on a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub role: Role,
}

impl Piece {
    fn from_char(c: char) -> Option<Self> {
        let role = match c.to_ascii_lowercase() {
            'p' => Role::Pawn,
            'n' => Role::Knight,
            'b' => Role::Bishop,
            'r' => Role::Rook,
            'q' => Role::Queen,
            'k' => Role::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { color, role })
    }
}

/// Occupancy of the board: square → piece.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceMap {
    pieces: HashMap<Square, Piece>,
}

impl PieceMap {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the placement field of `fen`.
    ///
    /// # Errors
    ///
    /// Returns [`FenError`] if the placement is structurally malformed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use board_core::domain::fen::PieceMap;
    ///
    /// let map = PieceMap::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let placement = fen.split_whitespace().next().unwrap_or("");
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }

        let mut pieces = HashMap::new();
        // FEN lists rank 8 first.
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file: usize = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(FenError::BadChar(c));
                    }
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::BadChar(c))?;
                    if let Some(sq) = Square::new(file as u8, rank) {
                        pieces.insert(sq, piece);
                    }
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::FileCount {
                        rank: rank + 1,
                        files: file,
                    });
                }
            }
            if file != 8 {
                return Err(FenError::FileCount {
                    rank: rank + 1,
                    files: file,
                });
            }
        }
        Ok(Self { pieces })
    }

    /// Returns the piece on `sq`, if any.
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.pieces.get(&sq).copied()
    }

    /// Moves whatever stands on `from` to `to`, capturing anything on `to`.
    ///
    /// Does nothing when `from` is empty.
    pub fn relocate(&mut self, from: Square, to: Square) {
        if let Some(piece) = self.pieces.remove(&from) {
            self.pieces.insert(to, piece);
        }
    }

    /// Number of occupied squares.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// `true` when no square is occupied.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
