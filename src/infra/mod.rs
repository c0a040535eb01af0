mod composite_observer;
mod csv_observer;
mod default_observer;
mod pathfinding;
pub mod persistence;
mod training_observer;
mod types;
pub mod visualizing_observer;

pub use composite_observer::CompositeObserver;
pub use csv_observer::CsvObserver;
pub use default_observer::DefaultObserver;
pub use pathfinding::{PathPlanner, interior_filter, path_to_actions};
pub use training_observer::{ControlSignal, TrainingObserver};
pub use types::{Action, Bounds, Position};
pub use visualizing_observer::{Snapshot, VisualizingObserver};

// ============================================================================
// Helper functions
// ============================================================================

/// First move along `path`, which must start at `current`.
pub fn path_to_action(current: Position, path: &[Position]) -> Option<Action> {
    if path.len() < 2 {
        return None;
    }
    Action::between(current, path[1])
}
