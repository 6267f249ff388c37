pub mod experience;
pub mod qupdate;
pub mod approximator;
pub mod policy;
pub mod report;

use experience::ExperienceStore;
use qupdate::{BootstrapSource, QUpdate, Transition};
use approximator::QApproximator;
use policy::{ActionValueEstimator, Policy};
use report::{EpisodeLog, EpisodeSummary};
use crate::config::{BootstrapMode, Config, TrainingConfig};
use crate::error::Result;
use crate::game::{StateVector, ACTION_COUNT};
use crate::session::GameSession;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Counters and the pending transition carried between steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingState {
    /// Finished episodes.
    pub episode: usize,
    /// Steps taken in the current episode.
    pub step: usize,
    pub total_steps: usize,
    /// Last move, backed up once the state it led to is known.
    pub previous: Option<Transition>,
    pub last_loss: Option<f32>,
    /// Epochs the approximator has been trained for, across all refits.
    pub epochs_trained: usize,
}

/// Everything learned so far, enough to resume training or drive a player.
#[derive(Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub store: ExperienceStore,
    pub approximator: QApproximator,
    pub episodes: usize,
}

impl Checkpoint {
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }
}

/// Plays episodes on its own session, backing up each move into the
/// experience store and refitting the approximator on a fixed step cadence.
pub struct Trainer {
    config: TrainingConfig,
    session: GameSession,
    store: ExperienceStore,
    approximator: QApproximator,
    policy: Box<dyn Policy>,
    update: QUpdate,
    rng: StdRng,
    state: TrainingState,
}

impl Trainer {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.game.seed, 2);
        let approximator = QApproximator::new(&config.model, &mut rng);
        Ok(Self::assemble(config, ExperienceStore::new(config.training.memory_size), approximator, rng, 0))
    }

    /// Picks up from a checkpoint; the restored store keeps its own capacity.
    pub fn resume(config: &Config, checkpoint: Checkpoint) -> Result<Self> {
        config.validate()?;
        if checkpoint.store.capacity() != config.training.memory_size {
            log::warn!(
                "checkpoint store capacity {} differs from configured memory size {}, keeping {}",
                checkpoint.store.capacity(), config.training.memory_size, checkpoint.store.capacity()
            );
        }
        let rng = seeded_rng(config.game.seed, 2);
        Ok(Self::assemble(config, checkpoint.store, checkpoint.approximator, rng, checkpoint.episodes))
    }

    fn assemble(config: &Config, store: ExperienceStore, approximator: QApproximator, rng: StdRng, episodes: usize) -> Self {
        let training = config.training.clone();
        let epochs_trained = approximator.epochs_trained();
        let policy = policy::build(training.policy, training.epsilon, config.game.seed.map(|seed| seed.wrapping_add(1)));
        Self {
            session: GameSession::new(config.game.start_tiles, config.game.seed),
            update: QUpdate::new(training.gamma, training.model_discount),
            config: training,
            store,
            approximator,
            policy,
            rng,
            state: TrainingState { episode: episodes, epochs_trained, ..TrainingState::default() },
        }
    }

    pub fn state(&self) -> &TrainingState {&self.state}
    pub fn store(&self) -> &ExperienceStore {&self.store}
    pub fn approximator(&self) -> &QApproximator {&self.approximator}
    pub fn session(&self) -> &GameSession {&self.session}

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            store: self.store.clone(),
            approximator: self.approximator.clone(),
            episodes: self.state.episode,
        }
    }

    /// Runs the configured episode budget, appending each summary to `log` if given.
    pub fn run(&mut self, mut log: Option<&mut EpisodeLog>) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(self.config.episodes);
        for _ in 0..self.config.episodes {
            let summary = self.run_episode()?;
            if let Some(log) = log.as_deref_mut() {
                log.record(&summary)?;
            }
            summaries.push(summary);
        }
        Ok(summaries)
    }

    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        self.session.new_game();
        self.begin_episode();
        self.play_out()
    }

    /// Plays the current session to the end without resetting it first.
    pub fn play_out(&mut self) -> Result<EpisodeSummary> {
        while !self.session.is_terminal() && self.state.step < self.config.max_steps_per_episode {
            self.step()?;
        }

        let last = self.session.state();
        let terminal = self.session.is_terminal();
        if !terminal {
            log::debug!("episode {} hit the step guard at {} steps", self.state.episode + 1, self.state.step);
        }
        self.back_up(&last, terminal);
        self.store.observe(&last);

        self.state.episode += 1;
        let summary = EpisodeSummary {
            episode: self.state.episode,
            steps: self.state.step,
            score: self.session.score(),
            max_tile: self.session.grid().max_tile(),
            store_len: self.store.len(),
            last_loss: self.state.last_loss,
        };
        log::info!(
            "episode {}: {} steps, score {}, max tile {}, {} states stored",
            summary.episode, summary.steps, summary.score, summary.max_tile, summary.store_len
        );
        Ok(summary)
    }

    fn begin_episode(&mut self) {
        self.state.step = 0;
        self.state.previous = None;
    }

    /// One move: back up the pending transition, choose and apply an action,
    /// then refit if the cadence is due.
    pub fn step(&mut self) -> Result<()> {
        let current = self.session.state();
        self.back_up(&current, false);
        self.store.observe(&current);

        let estimator: &dyn ActionValueEstimator = if self.approximator.is_trained() {
            &self.approximator
        } else {
            &self.store
        };
        let action = self.policy.choose_action(&current, estimator);
        let outcome = self.session.apply(action);
        log::trace!("step {}: {} -> moved {}, reward {}", self.state.step, action, outcome.moved, outcome.reward);

        self.state.previous = Some(Transition { state: current, action, reward: outcome.reward });
        self.state.step += 1;
        self.state.total_steps += 1;

        if self.state.total_steps % self.config.retrain_every == 0 {
            self.refit()?;
        }
        Ok(())
    }

    /// Fits the approximator on a snapshot of the whole store; returns the final loss.
    pub fn refit(&mut self) -> Result<f32> {
        let dataset = self.store.snapshot();
        let loss = self.approximator.fit(&dataset, self.config.batch_size, self.config.epochs, &mut self.rng)?;
        log::info!("refit on {} states after {} steps, loss {:.6}", dataset.len(), self.state.total_steps, loss);
        self.state.last_loss = Some(loss);
        self.state.epochs_trained = self.approximator.epochs_trained();
        Ok(loss)
    }

    fn bootstrap_source(&self) -> BootstrapSource {
        match self.config.bootstrap {
            BootstrapMode::Table => BootstrapSource::Table,
            BootstrapMode::Model => BootstrapSource::Model,
            BootstrapMode::Auto if self.approximator.is_trained() => BootstrapSource::Model,
            BootstrapMode::Auto => BootstrapSource::Table,
        }
    }

    // runs before `next` is observed so that a full store cannot evict the
    // previous state out from under its own update
    fn back_up(&mut self, next: &StateVector, terminal: bool) {
        let Some(previous) = self.state.previous.take() else {
            return;
        };
        let source = self.bootstrap_source();
        let next_values = match source {
            BootstrapSource::Table => self.store.action_values(&next.key()).unwrap_or([0.0; ACTION_COUNT]),
            BootstrapSource::Model => self.approximator.predict(next),
        };
        let target = self.update.target(source, previous.reward, &next_values, terminal);
        if !self.store.update(&previous.state.key(), previous.action.index(), target) {
            log::trace!("state {} no longer stored, backup dropped", previous.state.key());
        }
    }
}

fn seeded_rng(seed: Option<u64>, offset: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset)),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}
