use tilers::{Checkpoint, Config, EpisodeLog, Trainer};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

/// Headless Q-learning over self-played 2048 games
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(about = "Train the action-value model by self-play", long_about = None)]
struct Args {
    /// TOML configuration file, defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of episodes, overrides the configuration
    #[arg(long)]
    episodes: Option<usize>,

    /// Seed for spawns, policy and model, overrides the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Append one CSV row per finished episode to this file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Where to write the store and model when training ends
    #[arg(long, default_value = "input/tilers_checkpoint.bin")]
    checkpoint: PathBuf,

    /// Continue from an existing checkpoint
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(episodes) = args.episodes {
        config.training.episodes = episodes;
    }
    if args.seed.is_some() {
        config.game.seed = args.seed;
    }

    let mut trainer = match &args.resume {
        Some(path) => {
            log::info!("resuming from {}", path.display());
            Trainer::resume(&config, Checkpoint::load(path)?)?
        }
        None => Trainer::new(&config)?,
    };

    let mut stats = match &args.stats {
        Some(path) => Some(EpisodeLog::create(path)?),
        None => None,
    };

    log::info!("starting training for {} episodes", config.training.episodes);
    let summaries = trainer.run(stats.as_mut())?;

    let best = summaries.iter().map(|summary| summary.score).max().unwrap_or(0);
    let best_tile = summaries.iter().map(|summary| summary.max_tile).max().unwrap_or(0);
    log::info!("training finished: best score {}, best tile {}, {} states stored", best, best_tile, trainer.store().len());

    if let Some(parent) = args.checkpoint.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    trainer.checkpoint().store(&args.checkpoint)?;
    log::info!("saved checkpoint to {}", args.checkpoint.display());

    Ok(())
}
