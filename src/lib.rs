pub mod error;
pub mod config;

pub use error::{Error, Result};
pub use config::{Config, GameConfig, TrainingConfig, ModelConfig};

pub mod game;

pub use game::{
    Direction,
    Grid,
    MoveOutcome,
    Tile,
    TileId,
    StateKey,
    StateVector,
    encode
};

pub mod session;
pub mod input;

pub use session::GameSession;
pub use input::Command;

pub mod sequential;

pub use sequential::tensor::Tensor;
pub use sequential::layer::{
    Layer,
    Dense,
    ReLU,
    Softmax
};
pub use sequential::loss::{
    Loss,
    CategoricalCrossEntropy,
    MeanSquaredError
};
pub use sequential::optimizer::{
    Optimizer,
    SGD,
};
pub use sequential::Sequential;

pub mod agent;

pub use agent::{Checkpoint, Trainer, TrainingState};
pub use agent::experience::ExperienceStore;
pub use agent::qupdate::{QUpdate, Transition};
pub use agent::approximator::QApproximator;
pub use agent::policy::{ActionValueEstimator, Policy};
pub use agent::report::{EpisodeLog, EpisodeSummary};
