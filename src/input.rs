use crate::game::Direction;

/// A user or driver request, already stripped of its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Quit,
}

impl Command {
    /// Maps a key name (case-insensitive) to a command.
    /// Unmapped names are a normal `None`, never an error.
    pub fn parse(name: &str) -> Option<Self> {
        let command = match name.trim().to_ascii_lowercase().as_str() {
            "left" | "arrowleft" | "a" => Command::Move(Direction::Left),
            "right" | "arrowright" | "d" => Command::Move(Direction::Right),
            "up" | "arrowup" | "w" => Command::Move(Direction::Up),
            "down" | "arrowdown" | "s" => Command::Move(Direction::Down),
            "escape" | "q" => Command::Quit,
            _ => return None,
        };
        Some(command)
    }

    /// Action numbers as chosen by a driver: 1 left, 2 right, 3 up, 4 down.
    pub fn from_action_number(number: u8) -> Option<Self> {
        Direction::from_action_number(number).map(Command::Move)
    }
}
