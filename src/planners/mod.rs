pub mod executor;
pub mod metrics;
pub mod options;
pub mod phase;
pub mod q_planner;
pub mod trainer;

pub use executor::{ClearKind, ExecutionOutcome, ExecutionStatus, ExecutorConfig, OptionExecutor};
pub use metrics::{EvaluationMetrics, MovingAverage, TrainingMetrics};
pub use options::{ExecuteOption, OptionKind, TaskOption};
pub use phase::Phase;
pub use q_planner::{OptionPlanner, PlannerConfig, QRow, StateKey};
pub use trainer::{EpisodeMode, EpisodeOutcome, EpisodeSummary, TrainingReport, Trainer};
