use crate::infra::{Action, PathPlanner, Position, interior_filter};
use crate::state::GridWorld;

use super::ExecuteOption;

/// Route back to the object around obstacles.
///
/// Prefers routes that stay off the boundary ring, then any obstacle-free
/// route. When the object is walled off it heads for the closest reachable
/// cell that sits next to an obstacle on the object's side, and waits there
/// for a clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnToObjectOption {
    object: Option<Position>,
}

impl ReturnToObjectOption {
    /// Reachable free cell, in breadth-first order from the agent, with an
    /// obstacle neighbour closer to `object` than the cell itself.
    fn staging_cell(world: &GridWorld, object: Position) -> Option<Position> {
        let grid = world.grid();
        PathPlanner::reachable_cells(grid, world.position())
            .into_iter()
            .find(|cell| {
                cell.neighbors().iter().any(|n| {
                    grid.is_obstacle(n) && n.distance(&object) < cell.distance(&object)
                })
            })
    }
}

impl ExecuteOption for ReturnToObjectOption {
    fn name(&self) -> &'static str {
        "ReturnToObject"
    }

    fn on_select(&mut self, world: &GridWorld, _destination: Position) {
        self.object = world.object();
    }

    fn is_complete(&self, world: &GridWorld) -> bool {
        world.is_carrying()
    }

    fn policy(&self, world: &GridWorld) -> Action {
        let Some(object) = world.object().or(self.object) else {
            return Action::None;
        };
        let grid = world.grid();
        let start = world.position();

        if let Some(action) = PathPlanner::next_step_with(grid, start, object, interior_filter(grid))
        {
            return action;
        }
        if let Some(action) = PathPlanner::next_step(grid, start, object, true) {
            return action;
        }

        match Self::staging_cell(world, object) {
            Some(cell) if cell == start => Action::None,
            Some(cell) => PathPlanner::next_step(grid, start, cell, true).unwrap_or(Action::None),
            None => Action::None,
        }
    }
}
