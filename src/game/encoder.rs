use super::{Grid, CELL_COUNT, SIZE};
use serde::{Serialize, Deserialize};
use std::fmt;

/// Row-major log2 projection of a grid, 0 for an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StateVector([u8; CELL_COUNT]);

/// Stable byte encoding of a `StateVector`, used to key the experience store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey([u8; CELL_COUNT]);

pub fn encode(grid: &Grid) -> StateVector {
    let mut cells = [0u8; CELL_COUNT];
    for tile in grid.tiles() {
        cells[tile.row * SIZE + tile.column] = tile.exponent();
    }
    StateVector(cells)
}

impl StateVector {
    pub fn from_exponents(cells: [u8; CELL_COUNT]) -> Self {
        Self(cells)
    }

    pub fn exponents(&self) -> &[u8; CELL_COUNT] {
        &self.0
    }

    pub fn key(&self) -> StateKey {
        StateKey(self.0)
    }

    pub fn features(&self) -> [f32; CELL_COUNT] {
        self.0.map(f32::from)
    }
}

impl StateKey {
    pub fn as_bytes(&self) -> &[u8; CELL_COUNT] {
        &self.0
    }

    pub fn state(&self) -> StateVector {
        StateVector(self.0)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, exponent) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", exponent)?;
        }
        Ok(())
    }
}
