use crate::infra::{Action, PathPlanner, Position};
use crate::state::GridWorld;

use super::ExecuteOption;

/// Heads straight for the object, planning as if obstacles were absent.
/// Runs into obstacles on purpose; the executor's stuck guard ends it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveToObjectOption;

impl ExecuteOption for MoveToObjectOption {
    fn name(&self) -> &'static str {
        "MoveToObject"
    }

    fn on_select(&mut self, _world: &GridWorld, _destination: Position) {}

    fn is_complete(&self, world: &GridWorld) -> bool {
        if world.is_carrying() {
            return true;
        }
        match world.object() {
            Some(object) => world.position() == object,
            None => true,
        }
    }

    fn policy(&self, world: &GridWorld) -> Action {
        world
            .object()
            .and_then(|object| {
                PathPlanner::next_step_ignoring_obstacles(world.grid(), world.position(), object)
            })
            .unwrap_or(Action::None)
    }
}
