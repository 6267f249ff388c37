use serde::{Serialize, Deserialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single numbered block on the grid.
///
/// Tiles are values: a tile that slides keeps its id and gets a new position,
/// a merge destroys both sources and creates a fresh tile with a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub row: usize,
    pub column: usize,
    pub value: u32,
}

impl Tile {
    pub(crate) fn new(id: TileId, row: usize, column: usize, value: u32) -> Self {
        Self { id, row, column, value }
    }

    // base-2 exponent, 2 -> 1, 4 -> 2, ...
    pub fn exponent(&self) -> u8 {
        self.value.trailing_zeros() as u8
    }

    pub(crate) fn moved_to(self, row: usize, column: usize) -> Self {
        Self { row, column, ..self }
    }
}

/// Largest tile a 4x4 board can produce; tiles of this value never merge.
pub const MAX_TILE_VALUE: u32 = 1 << 17;

pub fn is_valid_value(value: u32) -> bool {
    (2..=MAX_TILE_VALUE).contains(&value) && value.is_power_of_two()
}
