//! Temporally-extended sub-policies the planner chooses between.

mod clear_obstacle;
mod helpers;
mod loop_guard;
mod move_object_to_target;
mod move_to_object;
mod move_to_target;
mod return_to_object;

use std::fmt;

pub use clear_obstacle::ClearObstacleOption;
pub(crate) use helpers::strategic_obstacle;
pub use loop_guard::{LOOP_WINDOW, LoopGuard};
pub use move_object_to_target::MoveObjectToTargetOption;
pub use move_to_object::MoveToObjectOption;
pub use move_to_target::MoveToTargetOption;
pub use return_to_object::ReturnToObjectOption;

use crate::infra::{Action, Position};
use crate::state::GridWorld;

/// Behaviour shared by every option.
///
/// `policy` must not change the option: calling it twice on the same world
/// returns the same action. Per-tick bookkeeping goes in `record`, which the
/// executor calls after every primitive step.
pub trait ExecuteOption {
    fn name(&self) -> &'static str;
    fn on_select(&mut self, world: &GridWorld, destination: Position);
    fn is_complete(&self, world: &GridWorld) -> bool;
    fn policy(&self, world: &GridWorld) -> Action;
    fn record(&mut self, _action: Action, _world: &GridWorld) {}
}

/// Option identifiers. The discriminant is the option's index in the
/// catalogue and its column in the Q-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKind {
    MoveToTarget = 0,
    ClearObstacle = 1,
    MoveToObject = 2,
    ReturnToObject = 3,
    MoveObjectToTarget = 4,
}

impl OptionKind {
    pub const ALL: [OptionKind; 5] = [
        OptionKind::MoveToTarget,
        OptionKind::ClearObstacle,
        OptionKind::MoveToObject,
        OptionKind::ReturnToObject,
        OptionKind::MoveObjectToTarget,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", TaskOption::new(*self).name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOption {
    MoveToTarget(MoveToTargetOption),
    ClearObstacle(ClearObstacleOption),
    MoveToObject(MoveToObjectOption),
    ReturnToObject(ReturnToObjectOption),
    MoveObjectToTarget(MoveObjectToTargetOption),
}

impl TaskOption {
    pub fn new(kind: OptionKind) -> Self {
        match kind {
            OptionKind::MoveToTarget => TaskOption::MoveToTarget(MoveToTargetOption::default()),
            OptionKind::ClearObstacle => TaskOption::ClearObstacle(ClearObstacleOption::default()),
            OptionKind::MoveToObject => TaskOption::MoveToObject(MoveToObjectOption),
            OptionKind::ReturnToObject => {
                TaskOption::ReturnToObject(ReturnToObjectOption::default())
            }
            OptionKind::MoveObjectToTarget => {
                TaskOption::MoveObjectToTarget(MoveObjectToTargetOption::default())
            }
        }
    }

    /// One instance of every option, in index order.
    pub fn catalogue() -> Vec<TaskOption> {
        OptionKind::ALL.into_iter().map(TaskOption::new).collect()
    }

    pub fn kind(&self) -> OptionKind {
        match self {
            TaskOption::MoveToTarget(_) => OptionKind::MoveToTarget,
            TaskOption::ClearObstacle(_) => OptionKind::ClearObstacle,
            TaskOption::MoveToObject(_) => OptionKind::MoveToObject,
            TaskOption::ReturnToObject(_) => OptionKind::ReturnToObject,
            TaskOption::MoveObjectToTarget(_) => OptionKind::MoveObjectToTarget,
        }
    }

    /// A `None` action from this option is a request to clear an adjacent obstacle.
    pub fn is_obstacle_clearer(&self) -> bool {
        matches!(self, TaskOption::ClearObstacle(_))
    }

    fn behaviour(&self) -> &dyn ExecuteOption {
        match self {
            TaskOption::MoveToTarget(option) => option,
            TaskOption::ClearObstacle(option) => option,
            TaskOption::MoveToObject(option) => option,
            TaskOption::ReturnToObject(option) => option,
            TaskOption::MoveObjectToTarget(option) => option,
        }
    }

    fn behaviour_mut(&mut self) -> &mut dyn ExecuteOption {
        match self {
            TaskOption::MoveToTarget(option) => option,
            TaskOption::ClearObstacle(option) => option,
            TaskOption::MoveToObject(option) => option,
            TaskOption::ReturnToObject(option) => option,
            TaskOption::MoveObjectToTarget(option) => option,
        }
    }
}

impl ExecuteOption for TaskOption {
    fn name(&self) -> &'static str {
        self.behaviour().name()
    }

    #[tracing::instrument(level = "debug", skip(self, world), fields(option = self.name()))]
    fn on_select(&mut self, world: &GridWorld, destination: Position) {
        self.behaviour_mut().on_select(world, destination);
    }

    fn is_complete(&self, world: &GridWorld) -> bool {
        self.behaviour().is_complete(world)
    }

    fn policy(&self, world: &GridWorld) -> Action {
        self.behaviour().policy(world)
    }

    fn record(&mut self, action: Action, world: &GridWorld) {
        self.behaviour_mut().record(action, world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_world() -> GridWorld {
        GridWorld::from_layout(
            6,
            6,
            Position::new(1, 1),
            Position::new(5, 5),
            Some(Position::new(4, 1)),
            &[Position::new(2, 1), Position::new(1, 2), Position::new(3, 4)],
        )
        .unwrap()
    }

    #[test]
    fn test_catalogue_matches_indices() {
        let catalogue = TaskOption::catalogue();
        assert_eq!(catalogue.len(), OptionKind::ALL.len());
        for (index, option) in catalogue.iter().enumerate() {
            assert_eq!(option.kind().index(), index);
            assert_eq!(OptionKind::from_index(index), Some(option.kind()));
        }
        assert_eq!(OptionKind::from_index(5), None);
        assert_eq!(OptionKind::ReturnToObject.to_string(), "ReturnToObject");
    }

    #[test]
    fn test_policies_are_idempotent() {
        let world = sample_world();
        for mut option in TaskOption::catalogue() {
            option.on_select(&world, world.current_destination());
            let snapshot = option.clone();
            let first = option.policy(&world);
            let second = option.policy(&world);
            assert_eq!(first, second, "{} changed its answer", option.name());
            assert_eq!(option, snapshot, "{} mutated in policy", option.name());
        }
    }

    #[test]
    fn test_only_clear_obstacle_requests_clears() {
        let clearers: Vec<OptionKind> = TaskOption::catalogue()
            .iter()
            .filter(|o| o.is_obstacle_clearer())
            .map(|o| o.kind())
            .collect();
        assert_eq!(clearers, vec![OptionKind::ClearObstacle]);
    }
}
