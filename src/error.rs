//! Errors raised by configuration and persistence.
use thiserror::Error;

/// Malformed configuration. Always fatal, raised at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid dimensions must be positive (got {width}x{height})")]
    ZeroDimension { width: i32, height: i32 },

    #[error("grid must be at least 3x3 to hold agent, target and object (got {width}x{height})")]
    GridTooSmall { width: i32, height: i32 },

    #[error("{name} at {position} lies outside the {width}x{height} grid")]
    OutOfBounds {
        name: &'static str,
        position: crate::infra::Position,
        width: i32,
        height: i32,
    },

    #[error("{first} and {second} share cell {position}")]
    Overlap {
        first: &'static str,
        second: &'static str,
        position: crate::infra::Position,
    },

    #[error("grid sides are limited to {max} cells (got {width}x{height})")]
    GridTooLarge { width: i32, height: i32, max: i32 },

    #[error("obstacle density must be in [0, 1) (got {0})")]
    ObstacleDensity(f32),

    #[error("{0} must be greater than zero")]
    ZeroBudget(&'static str),

    #[error("option catalogue is empty")]
    EmptyCatalogue,

    #[error("{name} = {value} is outside {range}")]
    Hyperparameter {
        name: &'static str,
        value: f32,
        range: &'static str,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

/// Failure while reading or writing Q-table and training-log files.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed state key {0:?}")]
    StateKey(String),

    #[error("malformed Q-value {value:?} in row {row}")]
    Value { row: usize, value: String },
}
