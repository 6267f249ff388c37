use tilers::agent::policy::{self, ActionValueEstimator, Policy};
use tilers::config::PolicyKind;
use tilers::{encode, Checkpoint, Command, Config, Direction, ExperienceStore, GameSession, Grid};
use clap::Parser;
use macroquad::prelude::*;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const SCORE_AREA_HEIGHT: f32 = 80.0;
const SCORE_TEXT_SIZE: f32 = 30.0;
const CELL_SIZE: f32 = 110.0;
const CELL_GAP: f32 = 10.0;
const BOARD_SIZE: f32 = 4.0 * CELL_SIZE + 5.0 * CELL_GAP;

/// Play 2048 in a window, yourself or by watching the agent
#[derive(Parser, Debug)]
#[command(name = "play")]
#[command(about = "Play 2048 or watch the agent play", long_about = None)]
struct Args {
    /// TOML configuration file, only the [game] section is used here
    #[arg(long)]
    config: Option<PathBuf>,

    /// Checkpoint written by `train`; without one the agent moves at random
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Seed for tile spawns
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Human,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Menu,
    Playing(Mode),
    /// Quit gate; `None` returns to the menu when declined.
    ConfirmQuit(Option<Mode>),
}

impl Screen {
    // quitting always passes the confirmation gate, from the menu too
    fn request_quit(self) -> Screen {
        match self {
            Screen::Menu => Screen::ConfirmQuit(None),
            Screen::Playing(mode) => Screen::ConfirmQuit(Some(mode)),
            gate @ Screen::ConfirmQuit(_) => gate,
        }
    }

    fn decline_quit(self) -> Screen {
        match self {
            Screen::ConfirmQuit(Some(mode)) => Screen::Playing(mode),
            Screen::ConfirmQuit(None) => Screen::Menu,
            other => other,
        }
    }
}

/// Greedy over a loaded checkpoint, uniform random otherwise.
struct AiPlayer {
    policy: Box<dyn Policy>,
    checkpoint: Option<Checkpoint>,
    empty: ExperienceStore,
}

impl AiPlayer {
    fn new(checkpoint: Option<Checkpoint>, seed: Option<u64>) -> Self {
        let kind = if checkpoint.is_some() { PolicyKind::Greedy } else { PolicyKind::Uniform };
        Self {
            policy: policy::build(kind, 0.0, seed),
            checkpoint,
            empty: ExperienceStore::new(1),
        }
    }

    fn choose(&mut self, grid: &Grid) -> Direction {
        let state = encode(grid);
        let Some(checkpoint) = &self.checkpoint else {
            return self.policy.choose_action(&state, &self.empty);
        };
        let estimator: &dyn ActionValueEstimator = if checkpoint.approximator.is_trained() {
            &checkpoint.approximator
        } else {
            &checkpoint.store
        };
        let chosen = self.policy.choose_action(&state, estimator);
        if grid.can_move(chosen) {
            return chosen;
        }
        // a greedy pick that cannot move would stall the game forever
        let values = estimator.estimate(&state);
        Direction::ALL
            .into_iter()
            .filter(|&direction| grid.can_move(direction))
            .max_by(|a, b| values[a.index()].total_cmp(&values[b.index()]))
            .unwrap_or(chosen)
    }
}

struct App {
    session: GameSession,
    screen: Screen,
    ai: AiPlayer,
    jitter_ms: [u64; 2],
    tick_seconds: f32,
    time_accumulator: f32,
    pending_spawns: Vec<f64>,
    exit: bool,
}

impl App {
    fn new(config: &Config, ai: AiPlayer) -> Self {
        Self {
            session: GameSession::new(config.game.start_tiles, config.game.seed),
            screen: Screen::Menu,
            ai,
            jitter_ms: config.game.spawn_jitter_ms,
            tick_seconds: config.game.ai_tick_ms as f32 / 1000.0,
            time_accumulator: 0.0,
            pending_spawns: Vec::new(),
            exit: false,
        }
    }

    fn start(&mut self, mode: Mode) {
        self.session.reset_score();
        self.session.clear();
        let now = get_time();
        self.pending_spawns = (0..self.session.start_tiles())
            .map(|_| now + rand::gen_range(self.jitter_ms[0], self.jitter_ms[1] + 1) as f64 / 1000.0)
            .collect();
        self.time_accumulator = 0.0;
        self.screen = Screen::Playing(mode);
        log::info!("new {:?} game", mode);
    }

    fn ready(&self) -> bool {
        self.pending_spawns.is_empty()
    }

    fn update(&mut self) {
        let now = get_time();
        let due = self.pending_spawns.iter().filter(|&&at| at <= now).count();
        self.pending_spawns.retain(|&at| at > now);
        for _ in 0..due {
            self.session.spawn_tile();
        }

        match self.screen {
            Screen::Menu => {
                if is_key_pressed(KeyCode::H) || is_key_pressed(KeyCode::Key1) {
                    self.start(Mode::Human);
                } else if is_key_pressed(KeyCode::I) || is_key_pressed(KeyCode::Key2) {
                    self.start(Mode::Ai);
                } else if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q) {
                    self.screen = self.screen.request_quit();
                }
            }
            Screen::ConfirmQuit(_) => {
                if is_key_pressed(KeyCode::Y) || is_key_pressed(KeyCode::Enter) {
                    self.exit = true;
                } else if is_key_pressed(KeyCode::N) || is_key_pressed(KeyCode::Escape) {
                    self.screen = self.screen.decline_quit();
                }
            }
            Screen::Playing(mode) => self.update_playing(mode),
        }
    }

    fn update_playing(&mut self, mode: Mode) {
        let command = get_last_key_pressed().and_then(|key| Command::parse(&format!("{:?}", key)));
        if command == Some(Command::Quit) {
            self.screen = self.screen.request_quit();
            return;
        }

        if self.ready() && self.session.is_terminal() {
            if is_key_pressed(KeyCode::R) {
                self.start(mode);
            } else if is_key_pressed(KeyCode::M) {
                self.screen = Screen::Menu;
            }
            return;
        }
        if !self.ready() {
            return;
        }

        match mode {
            Mode::Human => {
                if let Some(command) = command {
                    self.session.handle(command);
                }
            }
            Mode::Ai => {
                self.time_accumulator += get_frame_time();
                // one move per tick, and no more ticks once the game is over
                while self.time_accumulator >= self.tick_seconds && !self.session.is_terminal() {
                    self.time_accumulator -= self.tick_seconds;
                    let direction = self.ai.choose(self.session.grid());
                    let outcome = self.session.apply(direction);
                    log::debug!("ai moved {}: reward {}", direction, outcome.reward);
                }
                if self.session.is_terminal() {
                    log::info!("ai finished with score {}, max tile {}", self.session.score(), self.session.grid().max_tile());
                }
            }
        }
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "tilers".to_owned(),
        window_width: BOARD_SIZE as i32,
        window_height: (SCORE_AREA_HEIGHT + BOARD_SIZE) as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("could not load {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if args.seed.is_some() {
        config.game.seed = args.seed;
    }
    let seed = config.game.seed.unwrap_or_else(|| {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or(0)
    });
    rand::srand(seed);

    let checkpoint = match &args.checkpoint {
        Some(path) => match Checkpoint::load(path) {
            Ok(checkpoint) => {
                log::info!("loaded checkpoint {} with {} states", path.display(), checkpoint.store.len());
                Some(checkpoint)
            }
            Err(err) => {
                log::error!("could not load checkpoint {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let mut app = App::new(&config, AiPlayer::new(checkpoint, config.game.seed));

    while !app.exit {
        app.update();
        draw(&app);
        next_frame().await
    }
}

fn tile_color(value: u32) -> Color {
    match value {
        0 => Color::new(0.80, 0.75, 0.71, 1.0),
        2 => Color::new(0.93, 0.89, 0.85, 1.0),
        4 => Color::new(0.93, 0.88, 0.78, 1.0),
        8 => Color::new(0.95, 0.69, 0.47, 1.0),
        16 => Color::new(0.96, 0.58, 0.39, 1.0),
        32 => Color::new(0.96, 0.49, 0.37, 1.0),
        64 => Color::new(0.96, 0.37, 0.23, 1.0),
        128 => Color::new(0.93, 0.81, 0.45, 1.0),
        256 => Color::new(0.93, 0.80, 0.38, 1.0),
        512 => Color::new(0.93, 0.78, 0.31, 1.0),
        1024 => Color::new(0.93, 0.77, 0.25, 1.0),
        2048 => Color::new(0.93, 0.76, 0.18, 1.0),
        _ => Color::new(0.24, 0.23, 0.20, 1.0),
    }
}

fn draw_centered(text: &str, x: f32, y: f32, size: f32, color: Color) {
    let dims = measure_text(text, None, size as u16, 1.0);
    draw_text(text, x - dims.width / 2.0, y + dims.height / 2.0, size, color);
}

fn draw(app: &App) {
    clear_background(Color::new(0.98, 0.97, 0.94, 1.0));
    let screen_w = screen_width();

    // score area

    let score_text = format!("Score: {}   Best: {}", app.session.score(), app.session.high_score());
    draw_centered(&score_text, screen_w / 2.0, SCORE_AREA_HEIGHT / 2.0, SCORE_TEXT_SIZE, DARKGRAY);

    // board

    draw_rectangle(0.0, SCORE_AREA_HEIGHT, BOARD_SIZE, BOARD_SIZE, Color::new(0.73, 0.68, 0.63, 1.0));
    let values = app.session.grid().values();
    for (row, line) in values.iter().enumerate() {
        for (column, &value) in line.iter().enumerate() {
            let x = CELL_GAP + column as f32 * (CELL_SIZE + CELL_GAP);
            let y = SCORE_AREA_HEIGHT + CELL_GAP + row as f32 * (CELL_SIZE + CELL_GAP);
            draw_rectangle(x, y, CELL_SIZE, CELL_SIZE, tile_color(value));
            if value != 0 {
                let size = if value < 1000 { 48.0 } else { 36.0 };
                let color = if value <= 4 { DARKGRAY } else { WHITE };
                draw_centered(&value.to_string(), x + CELL_SIZE / 2.0, y + CELL_SIZE / 2.0, size, color);
            }
        }
    }

    // overlays

    let centre_y = SCORE_AREA_HEIGHT + BOARD_SIZE / 2.0;
    let overlay = Color::new(0.0, 0.0, 0.0, 0.6);
    match app.screen {
        Screen::Menu => {
            draw_rectangle(0.0, SCORE_AREA_HEIGHT, BOARD_SIZE, BOARD_SIZE, overlay);
            draw_centered("H: play yourself", screen_w / 2.0, centre_y - 30.0, SCORE_TEXT_SIZE, WHITE);
            draw_centered("I: watch the agent", screen_w / 2.0, centre_y + 10.0, SCORE_TEXT_SIZE, WHITE);
            draw_centered("Esc: quit", screen_w / 2.0, centre_y + 50.0, SCORE_TEXT_SIZE, WHITE);
        }
        Screen::ConfirmQuit(_) => {
            draw_rectangle(0.0, SCORE_AREA_HEIGHT, BOARD_SIZE, BOARD_SIZE, overlay);
            draw_centered("Quit? Y / N", screen_w / 2.0, centre_y, SCORE_TEXT_SIZE, WHITE);
        }
        Screen::Playing(_) if app.ready() && app.session.is_terminal() => {
            draw_rectangle(0.0, SCORE_AREA_HEIGHT, BOARD_SIZE, BOARD_SIZE, overlay);
            draw_centered("Game over", screen_w / 2.0, centre_y - 20.0, SCORE_TEXT_SIZE, WHITE);
            draw_centered("R: again   M: menu", screen_w / 2.0, centre_y + 20.0, SCORE_TEXT_SIZE, WHITE);
        }
        Screen::Playing(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_quit_asks_first() {
        let gate = Screen::Menu.request_quit();
        assert_eq!(gate, Screen::ConfirmQuit(None));
        assert_eq!(gate.decline_quit(), Screen::Menu);
    }

    #[test]
    fn test_declined_quit_resumes_game() {
        let gate = Screen::Playing(Mode::Ai).request_quit();
        assert_eq!(gate, Screen::ConfirmQuit(Some(Mode::Ai)));
        assert_eq!(gate.decline_quit(), Screen::Playing(Mode::Ai));
        assert_eq!(gate.request_quit(), gate);
    }
}
