pub mod tile;
pub mod encoder;

pub use tile::{Tile, TileId};
pub use encoder::{encode, StateKey, StateVector};

use rand::Rng;
use serde::{Serialize, Deserialize};
use std::fmt;

pub const SIZE: usize = 4;
pub const CELL_COUNT: usize = SIZE * SIZE;
pub const ACTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Ordered by action index.
    pub const ALL: [Direction; ACTION_COUNT] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    // index into an action-value vector
    pub fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Up => 2,
            Direction::Down => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// External action numbering: 1 left, 2 right, 3 up, 4 down.
    pub fn action_number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_action_number(number: u8) -> Option<Self> {
        (number as usize).checked_sub(1).and_then(Self::from_index)
    }

    // cells of one line, ordered from the leading edge inward
    fn line_cells(self, line: usize) -> [(usize, usize); SIZE] {
        let mut cells = [(0, 0); SIZE];
        for (offset, cell) in cells.iter_mut().enumerate() {
            *cell = match self {
                Direction::Left => (line, offset),
                Direction::Right => (line, SIZE - 1 - offset),
                Direction::Up => (offset, line),
                Direction::Down => (SIZE - 1 - offset, line),
            };
        }
        cells
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        };
        f.write_str(name)
    }
}

/// Result of resolving one directional move.
///
/// `reward` is the sum of the values of every tile created by a merge,
/// which is also the score gained by the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub moved: bool,
    pub reward: u64,
}

impl MoveOutcome {
    pub const NOOP: MoveOutcome = MoveOutcome { moved: false, reward: 0 };
}

#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    cells: [[Option<Tile>; SIZE]; SIZE],
    next_id: u64,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [[None; SIZE]; SIZE],
            next_id: 0,
        }
    }

    /// Builds a grid from raw cell values, 0 meaning empty.
    /// Cells holding anything that is not a power of two >= 2 are left empty.
    pub fn from_values(values: [[u32; SIZE]; SIZE]) -> Self {
        let mut grid = Self::new();
        for (row, line) in values.iter().enumerate() {
            for (column, &value) in line.iter().enumerate() {
                if value != 0 {
                    grid.place_tile(row, column, value);
                }
            }
        }
        grid
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Tile> {
        self.cells.get(row)?.get(column)?.as_ref()
    }

    // row-major
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.cells.iter().flatten().flatten()
    }

    pub fn values(&self) -> [[u32; SIZE]; SIZE] {
        let mut values = [[0; SIZE]; SIZE];
        for tile in self.tiles() {
            values[tile.row][tile.column] = tile.value;
        }
        values
    }

    pub fn tile_sum(&self) -> u64 {
        self.tiles().map(|tile| tile.value as u64).sum()
    }

    pub fn max_tile(&self) -> u32 {
        self.tiles().map(|tile| tile.value).max().unwrap_or(0)
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut empty = Vec::with_capacity(CELL_COUNT);
        for row in 0..SIZE {
            for column in 0..SIZE {
                if self.cells[row][column].is_none() {
                    empty.push((row, column));
                }
            }
        }
        empty
    }

    pub fn has_empty_cell(&self) -> bool {
        self.cells.iter().flatten().any(Option::is_none)
    }

    /// Puts a new tile on an empty cell. Returns `None` (and changes nothing)
    /// when the cell is out of range, occupied, or the value is not a tile value.
    pub fn place_tile(&mut self, row: usize, column: usize, value: u32) -> Option<Tile> {
        if row >= SIZE || column >= SIZE || !tile::is_valid_value(value) {
            return None;
        }
        if self.cells[row][column].is_some() {
            return None;
        }
        let tile = Tile::new(self.allocate_id(), row, column, value);
        self.cells[row][column] = Some(tile);
        Some(tile)
    }

    /// Places a 2 (90%) or a 4 (10%) on a uniformly chosen empty cell.
    /// A full grid is left untouched and yields `None`.
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Tile> {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return None;
        }
        let (row, column) = empty[rng.random_range(0..empty.len())];
        let value = if rng.random_range(0..10) < 9 { 2 } else { 4 };
        self.place_tile(row, column, value)
    }

    /// Slides every line toward the leading edge of `direction`, merging
    /// equal neighbours once per move, scanning from the leading edge inward.
    /// A move that changes nothing leaves the grid untouched.
    pub fn resolve_move(&mut self, direction: Direction) -> MoveOutcome {
        let before = self.values();
        let mut reward = 0;

        for line in 0..SIZE {
            let cells = direction.line_cells(line);
            let tiles: Vec<Tile> = cells
                .iter()
                .filter_map(|&(row, column)| self.cells[row][column].take())
                .collect();

            // (tile, produced by a merge during this move)
            let mut placed: Vec<(Tile, bool)> = Vec::with_capacity(SIZE);
            for tile in tiles {
                let merge = matches!(placed.last(), Some((last, false)) if last.value == tile.value && last.value < tile::MAX_TILE_VALUE);
                if merge {
                    let id = self.allocate_id();
                    if let Some((last, merged)) = placed.last_mut() {
                        *last = Tile::new(id, last.row, last.column, last.value * 2);
                        *merged = true;
                        reward += last.value as u64;
                    }
                } else {
                    let (row, column) = cells[placed.len()];
                    placed.push((tile.moved_to(row, column), false));
                }
            }

            for (tile, _) in placed {
                self.cells[tile.row][tile.column] = Some(tile);
            }
        }

        MoveOutcome {
            moved: self.values() != before,
            reward,
        }
    }

    /// Trial resolution on a copy; the grid itself is not touched.
    pub fn can_move(&self, direction: Direction) -> bool {
        self.clone().resolve_move(direction).moved
    }

    pub fn is_terminal(&self) -> bool {
        !self.has_empty_cell() && Direction::ALL.iter().all(|&direction| !self.can_move(direction))
    }

    pub fn reset(&mut self) {
        self.cells = [[None; SIZE]; SIZE];
    }

    fn allocate_id(&mut self) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.values().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let cells: Vec<String> = row
                .iter()
                .map(|&value| if value == 0 { format!("{:>6}", ".") } else { format!("{:>6}", value) })
                .collect();
            write!(f, "{}", cells.join(""))?;
        }
        Ok(())
    }
}
