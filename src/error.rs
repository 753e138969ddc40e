use crate::life::group_tracker::TrackerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum FlockError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("event ring holds {capacity} events but {boids} boids need {needed}")]
    EventRingTooSmall {
        capacity: usize,
        boids: usize,
        needed: usize,
    },
    #[error("wav output failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
