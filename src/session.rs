use crate::game::{encode, Direction, Grid, MoveOutcome, StateVector, Tile};
use crate::input::Command;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// One game being played: the grid plus everything a front end reads off it.
///
/// Moves are applied here rather than on the grid directly so that score
/// and spawning stay in step with move resolution.
pub struct GameSession {
    grid: Grid,
    score: u64,
    high_score: u64,
    start_tiles: usize,
    rng: StdRng,
}

impl GameSession {
    pub fn new(start_tiles: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            grid: Grid::new(),
            score: 0,
            high_score: 0,
            start_tiles,
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {&self.grid}
    pub fn score(&self) -> u64 {self.score}
    pub fn high_score(&self) -> u64 {self.high_score}
    pub fn start_tiles(&self) -> usize {self.start_tiles}

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.grid.tiles()
    }

    pub fn state(&self) -> StateVector {
        encode(&self.grid)
    }

    pub fn is_terminal(&self) -> bool {
        self.grid.is_terminal()
    }

    /// Fresh game: score back to zero, empty grid, start tiles spawned.
    pub fn new_game(&mut self) {
        self.reset_score();
        self.grid.reset();
        for _ in 0..self.start_tiles {
            self.spawn_tile();
        }
    }

    /// Empties the grid without spawning, for front ends that spawn later.
    pub fn clear(&mut self) {
        self.grid.reset();
    }

    pub fn reset_score(&mut self) {
        self.score = 0;
    }

    /// Continues from a given position, e.g. a saved or hand-built grid.
    pub fn restore(&mut self, grid: Grid, score: u64) {
        self.grid = grid;
        self.score = score;
        self.high_score = self.high_score.max(score);
    }

    pub fn spawn_tile(&mut self) -> Option<Tile> {
        self.grid.spawn_tile(&mut self.rng)
    }

    /// Resolves a move; only a move that changed the grid scores and spawns.
    pub fn apply(&mut self, direction: Direction) -> MoveOutcome {
        let outcome = self.grid.resolve_move(direction);
        if outcome.moved {
            self.score += outcome.reward;
            self.high_score = self.high_score.max(self.score);
            self.spawn_tile();
        }
        outcome
    }

    /// Move commands are applied; anything else is left to the caller.
    pub fn handle(&mut self, command: Command) -> Option<MoveOutcome> {
        match command {
            Command::Move(direction) => Some(self.apply(direction)),
            Command::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game_spawns_start_tiles() {
        let mut session = GameSession::new(2, Some(1));
        session.new_game();
        assert_eq!(session.tiles().count(), 2);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_illegal_move_is_idempotent() {
        let mut session = GameSession::new(0, Some(3));
        session.new_game();
        session.grid.place_tile(0, 0, 2).unwrap();
        session.grid.place_tile(0, 1, 4).unwrap();
        let before = session.grid().clone();

        for _ in 0..2 {
            let outcome = session.apply(Direction::Left);
            assert_eq!(outcome, MoveOutcome::NOOP);
            assert_eq!(session.grid(), &before);
            assert_eq!(session.score(), 0);
        }
    }

    #[test]
    fn test_successful_move_scores_and_spawns() {
        let mut session = GameSession::new(0, Some(5));
        session.new_game();
        session.grid.place_tile(0, 0, 2).unwrap();
        session.grid.place_tile(0, 1, 2).unwrap();

        let outcome = session.apply(Direction::Left);

        assert_eq!(outcome.reward, 4);
        assert_eq!(session.score(), 4);
        assert_eq!(session.high_score(), 4);
        // merged tile plus one spawn
        assert_eq!(session.tiles().count(), 2);
    }

    #[test]
    fn test_high_score_survives_new_game() {
        let mut session = GameSession::new(0, Some(5));
        session.grid.place_tile(3, 0, 8).unwrap();
        session.grid.place_tile(3, 1, 8).unwrap();
        session.apply(Direction::Right);
        session.new_game();
        assert_eq!(session.score(), 0);
        assert_eq!(session.high_score(), 16);
    }

    #[test]
    fn test_handle_quit_is_not_a_move() {
        let mut session = GameSession::new(2, Some(9));
        session.new_game();
        let before = session.grid().clone();
        assert_eq!(session.handle(Command::Quit), None);
        assert_eq!(session.grid(), &before);
    }

    #[test]
    fn test_restore_keeps_high_score() {
        let mut session = GameSession::new(2, Some(4));
        let grid = Grid::from_values([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        session.restore(grid.clone(), 300);
        assert_eq!(session.grid(), &grid);
        assert_eq!(session.score(), 300);
        assert_eq!(session.high_score(), 300);
    }

    #[test]
    fn test_seeded_sessions_match() {
        let mut a = GameSession::new(2, Some(11));
        let mut b = GameSession::new(2, Some(11));
        a.new_game();
        b.new_game();
        assert_eq!(a.state(), b.state());
    }
}
