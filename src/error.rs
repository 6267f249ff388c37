use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Fitting was requested before any state was observed.
    #[error("cannot fit the approximator on an empty experience store")]
    EmptyDataset,

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt or unreadable checkpoint: {0}")]
    Checkpoint(#[from] bincode::Error),

    #[error("failed to write episode log: {0}")]
    EpisodeLog(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
