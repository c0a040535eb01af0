pub mod config;
pub mod error;
pub mod infra;
pub mod planners;
pub mod state;
#[cfg(feature = "visualizer")]
pub mod visualizer;

// Re-export commonly used types for convenience
pub use config::TrainingConfig;
pub use error::{ConfigError, PersistenceError};
pub use infra::{Action, PathPlanner, Position};
pub use planners::{OptionPlanner, Trainer};
pub use state::GridWorld;
