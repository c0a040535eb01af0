use crate::infra::{Action, PathPlanner, Position};
use crate::state::GridWorld;

use super::loop_guard::LoopGuard;

/// Greedy step toward `goal`, switching to exact search while the guard reports a loop.
/// Either strategy falls back to the other when it finds no move.
pub(crate) fn navigate(world: &GridWorld, goal: Position, guard: &LoopGuard) -> Action {
    let grid = world.grid();
    let start = world.position();
    if start == goal {
        return Action::None;
    }

    let exact = || PathPlanner::next_step(grid, start, goal, true);
    let greedy = || PathPlanner::smart_step(grid, start, goal);

    let action = if guard.is_looping() {
        exact().or_else(greedy)
    } else {
        greedy().or_else(exact)
    };
    action.unwrap_or(Action::None)
}

/// First adjacent obstacle (N, E, S, W) whose removal brings the agent closer to `destination`.
pub(crate) fn strategic_obstacle(world: &GridWorld, destination: Position) -> Option<Position> {
    let here = world.position().distance(&destination);
    world
        .adjacent_obstacles()
        .into_iter()
        .find(|cell| cell.distance(&destination) < here)
}
