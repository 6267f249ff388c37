//! Session configuration, loaded from TOML.
//!
//! Every field has a default so a file only needs the values it changes:
//!
//! ```toml
//! [training]
//! episodes = 200
//! policy = "epsilon_greedy"
//! ```

use crate::error::{Error, Result};
use serde::{Serialize, Deserialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub training: TrainingConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub start_tiles: usize,
    /// Delay range for start-tile spawns in the window, milliseconds.
    pub spawn_jitter_ms: [u64; 2],
    /// Interval between AI moves in the window, milliseconds.
    pub ai_tick_ms: u64,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_tiles: 2,
            spawn_jitter_ms: [300, 700],
            ai_tick_ms: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Uniform,
    Greedy,
    EpsilonGreedy,
}

/// Where the bootstrap estimate for the next state comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapMode {
    /// Table until the approximator has been fit once, then the model.
    Auto,
    Table,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub gamma: f32,
    pub epsilon: f32,
    pub memory_size: usize,
    pub retrain_every: usize,
    pub batch_size: usize,
    pub epochs: usize,
    pub episodes: usize,
    pub max_steps_per_episode: usize,
    pub policy: PolicyKind,
    pub bootstrap: BootstrapMode,
    pub model_discount: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            epsilon: 0.1,
            memory_size: 10_000,
            retrain_every: 500,
            batch_size: 32,
            epochs: 5,
            episodes: 1000,
            max_steps_per_episode: 10_000,
            policy: PolicyKind::Uniform,
            bootstrap: BootstrapMode::Auto,
            model_discount: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    MeanSquaredError,
    CategoricalCrossEntropy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f32,
    pub gradient_clip: Option<f32>,
    pub loss: LossKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![128, 64],
            learning_rate: 0.001,
            gradient_clip: Some(1.0),
            loss: LossKind::MeanSquaredError,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let game = &self.game;
        let training = &self.training;
        let model = &self.model;

        if game.start_tiles > crate::game::CELL_COUNT {
            return invalid(format!("start_tiles must be at most {}, got {}", crate::game::CELL_COUNT, game.start_tiles));
        }
        if game.spawn_jitter_ms[0] > game.spawn_jitter_ms[1] {
            return invalid(format!("spawn_jitter_ms range is inverted: {:?}", game.spawn_jitter_ms));
        }
        if game.ai_tick_ms == 0 {
            return invalid("ai_tick_ms must be at least 1".to_string());
        }
        if !(0.0..1.0).contains(&training.gamma) {
            return invalid(format!("gamma must be in [0, 1), got {}", training.gamma));
        }
        if !(0.0..=1.0).contains(&training.epsilon) {
            return invalid(format!("epsilon must be in [0, 1], got {}", training.epsilon));
        }
        if !training.model_discount.is_finite() || training.model_discount < 0.0 {
            return invalid(format!("model_discount must be finite and non-negative, got {}", training.model_discount));
        }
        for (name, value) in [
            ("memory_size", training.memory_size),
            ("retrain_every", training.retrain_every),
            ("batch_size", training.batch_size),
            ("epochs", training.epochs),
            ("episodes", training.episodes),
            ("max_steps_per_episode", training.max_steps_per_episode),
        ] {
            if value == 0 {
                return invalid(format!("{} must be at least 1", name));
            }
        }
        if !model.learning_rate.is_finite() || model.learning_rate <= 0.0 {
            return invalid(format!("learning_rate must be positive, got {}", model.learning_rate));
        }
        if let Some(clip) = model.gradient_clip {
            if !clip.is_finite() || clip <= 0.0 {
                return invalid(format!("gradient_clip must be positive, got {}", clip));
            }
        }
        if model.hidden_layers.contains(&0) {
            return invalid("hidden layers must have at least one unit".to_string());
        }
        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(Error::InvalidConfig(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.start_tiles, 2);
        assert_eq!(config.training.policy, PolicyKind::Uniform);
        assert_eq!(config.model.loss, LossKind::MeanSquaredError);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [training]
            gamma = 0.5
            memory_size = 64
            policy = "epsilon_greedy"
            bootstrap = "table"

            [model]
            hidden_layers = [32]
            loss = "categorical_cross_entropy"
            "#,
        ).unwrap();

        assert_eq!(config.training.gamma, 0.5);
        assert_eq!(config.training.memory_size, 64);
        assert_eq!(config.training.policy, PolicyKind::EpsilonGreedy);
        assert_eq!(config.training.bootstrap, BootstrapMode::Table);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.model.hidden_layers, vec![32]);
        assert_eq!(config.model.loss, LossKind::CategoricalCrossEntropy);
        assert_eq!(config.game, GameConfig::default());
    }

    #[test]
    fn test_rejects_bad_gamma() {
        let result = Config::from_toml_str("[training]\ngamma = 1.0\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = Config::default();
        config.training.memory_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_ai_tick() {
        let mut config = Config::default();
        config.game.ai_tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let result = Config::from_toml_str("[training]\npolicy = \"softmax\"\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.game.seed = Some(42);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
