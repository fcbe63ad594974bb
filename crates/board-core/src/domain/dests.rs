//! Destination sets: which squares each piece may move (or premove) to.
//!
//! On the wire a destination set is an array of `[origin, [dest, ...]]`
//! pairs:
//!
//! ```json
//! [["e2", ["e3", "e4"]], ["g1", ["f3", "h3"]]]
//! ```
//!
//! The host computes these; the widget never checks them against chess
//! rules.  The one adjustment made locally is [`DestinationSet::without_friendly_targets`],
//! which drops destinations occupied by a piece of the mover's own colour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::fen::PieceMap;
use super::square::Square;

/// Wire representation: ordered `(origin, destinations)` pairs.
pub type DestsWire = Vec<(Square, Vec<Square>)>;

/// Mapping from origin square to an ordered, duplicate-free list of
/// destination squares.
///
/// Origins whose destination list is empty are not stored, so
/// [`is_empty`](Self::is_empty) means "no dots to draw".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DestsWire", into = "DestsWire")]
pub struct DestinationSet {
    entries: BTreeMap<Square, Vec<Square>>,
}

impl DestinationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `dest` for `origin`, keeping first-seen order and skipping
    /// duplicates.
    pub fn insert(&mut self, origin: Square, dest: Square) {
        let list = self.entries.entry(origin).or_default();
        if !list.contains(&dest) {
            list.push(dest);
        }
    }

    /// Destinations for `origin`, or an empty slice.
    pub fn get(&self, origin: Square) -> &[Square] {
        self.entries.get(&origin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `true` if `origin → dest` is present.
    pub fn contains(&self, origin: Square, dest: Square) -> bool {
        self.get(origin).contains(&dest)
    }

    /// `true` when no origin has any destination.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of origins with at least one destination.
    pub fn origin_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterates `(origin, destinations)` in square order.
    pub fn iter(&self) -> impl Iterator<Item = (Square, &[Square])> {
        self.entries.iter().map(|(o, d)| (*o, d.as_slice()))
    }

    /// Returns a copy with every destination occupied by a piece of the
    /// same colour as the piece on its origin removed.
    ///
    /// Origins that are empty on `pieces` keep all their destinations.
    pub fn without_friendly_targets(&self, pieces: &PieceMap) -> Self {
        let mut out = Self::new();
        for (origin, dests) in self.iter() {
            let mover = pieces.get(origin).map(|p| p.color);
            for &dest in dests {
                let blocked = match (mover, pieces.get(dest)) {
                    (Some(mc), Some(occupant)) => occupant.color == mc,
                    _ => false,
                };
                if !blocked {
                    out.insert(origin, dest);
                }
            }
        }
        out
    }
}

impl From<DestsWire> for DestinationSet {
    fn from(wire: DestsWire) -> Self {
        let mut set = Self::new();
        for (origin, dests) in wire {
            for dest in dests {
                set.insert(origin, dest);
            }
        }
        set
    }
}

impl From<DestinationSet> for DestsWire {
    fn from(set: DestinationSet) -> Self {
        set.entries.into_iter().collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
