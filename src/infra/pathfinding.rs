use std::collections::{HashMap, HashSet, VecDeque};

use crate::infra::{Action, Position, path_to_action};
use crate::state::Grid;

/// Shortest-route queries over a read-only grid snapshot.
///
/// All searches are breadth-first over 4-connected cells with unit step cost.
/// Neighbours are expanded in N, E, S, W order and the first discovery of a
/// cell wins, so identical inputs always give identical routes.
pub struct PathPlanner;

impl PathPlanner {
    /// Find a cell path from `start` to `goal` (both included).
    /// `is_walkable` receives (position, goal) and decides whether the search may enter a cell.
    #[tracing::instrument(level = "trace", skip(grid, is_walkable), fields(start_x = start.x, start_y = start.y, goal_x = goal.x, goal_y = goal.y))]
    pub fn find_path<F>(
        grid: &Grid,
        start: Position,
        goal: Position,
        is_walkable: F,
    ) -> Option<Vec<Position>>
    where
        F: Fn(&Position, Position) -> bool,
    {
        if start == goal {
            return Some(vec![start]);
        }
        if !grid.in_bounds(&start) || !grid.in_bounds(&goal) {
            return None;
        }

        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        let mut expansions = 0usize;
        while let Some(current) = queue.pop_front() {
            expansions += 1;
            for neighbor in current.neighbors() {
                if neighbor == start || came_from.contains_key(&neighbor) {
                    continue;
                }
                if !grid.in_bounds(&neighbor) {
                    continue;
                }
                if !is_walkable(&neighbor, goal) {
                    continue;
                }

                came_from.insert(neighbor, current);
                if neighbor == goal {
                    tracing::trace!(expansions, "Path found");
                    return Some(reconstruct_path(&came_from, goal));
                }
                queue.push_back(neighbor);
            }
        }

        tracing::trace!(expansions, "No path found");
        None
    }

    /// Primitive actions from `start` to `goal`; empty when unreachable or already there.
    pub fn route(grid: &Grid, start: Position, goal: Position, avoid_obstacles: bool) -> Vec<Action> {
        Self::route_with(grid, start, goal, |pos, goal| {
            !avoid_obstacles || *pos == goal || !grid.is_obstacle(pos)
        })
    }

    pub fn route_ignoring_obstacles(grid: &Grid, start: Position, goal: Position) -> Vec<Action> {
        Self::route(grid, start, goal, false)
    }

    /// Like [`PathPlanner::route`] with a caller-supplied cell filter.
    pub fn route_with<F>(grid: &Grid, start: Position, goal: Position, is_walkable: F) -> Vec<Action>
    where
        F: Fn(&Position, Position) -> bool,
    {
        Self::find_path(grid, start, goal, is_walkable)
            .map(|path| path_to_actions(&path))
            .unwrap_or_default()
    }

    /// First action of the shortest route, re-planned against the live grid.
    pub fn next_step(
        grid: &Grid,
        start: Position,
        goal: Position,
        avoid_obstacles: bool,
    ) -> Option<Action> {
        Self::next_step_with(grid, start, goal, |pos, goal| {
            !avoid_obstacles || *pos == goal || !grid.is_obstacle(pos)
        })
    }

    pub fn next_step_ignoring_obstacles(
        grid: &Grid,
        start: Position,
        goal: Position,
    ) -> Option<Action> {
        Self::next_step(grid, start, goal, false)
    }

    pub fn next_step_with<F>(
        grid: &Grid,
        start: Position,
        goal: Position,
        is_walkable: F,
    ) -> Option<Action>
    where
        F: Fn(&Position, Position) -> bool,
    {
        let path = Self::find_path(grid, start, goal, is_walkable)?;
        path_to_action(start, &path)
    }

    /// Every cell reachable from `start` through non-obstacle cells, in
    /// breadth-first discovery order (`start` first).
    pub fn reachable_cells(grid: &Grid, start: Position) -> Vec<Position> {
        let mut order = vec![start];
        let mut seen: HashSet<Position> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for neighbor in current.neighbors() {
                if !grid.in_bounds(&neighbor) || grid.is_obstacle(&neighbor) {
                    continue;
                }
                if seen.insert(neighbor) {
                    order.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }
        order
    }

    /// Cheap greedy move: larger-offset axis first, then the other axis, then
    /// the two moves perpendicular to the first. Skips moves that leave the
    /// grid or enter an obstacle; `None` when every candidate is blocked.
    pub fn smart_step(grid: &Grid, start: Position, goal: Position) -> Option<Action> {
        if start == goal {
            return None;
        }

        let dx = goal.x - start.x;
        let dy = goal.y - start.y;
        let horizontal = match dx.signum() {
            1 => Some(Action::Right),
            -1 => Some(Action::Left),
            _ => None,
        };
        let vertical = match dy.signum() {
            1 => Some(Action::Down),
            -1 => Some(Action::Up),
            _ => None,
        };

        let (primary, secondary, perpendicular) = if dx.abs() >= dy.abs() {
            (horizontal, vertical, [Action::Up, Action::Down])
        } else {
            (vertical, horizontal, [Action::Left, Action::Right])
        };

        let mut candidates: Vec<Action> = Vec::with_capacity(4);
        for action in [primary, secondary].into_iter().flatten().chain(perpendicular) {
            if !candidates.contains(&action) {
                candidates.push(action);
            }
        }

        candidates.into_iter().find(|&action| {
            let next = start.offset(action);
            grid.in_bounds(&next) && !grid.is_obstacle(&next)
        })
    }
}

/// Keeps searches off the boundary ring; the goal itself is always allowed.
pub fn interior_filter(grid: &Grid) -> impl Fn(&Position, Position) -> bool + '_ {
    let interior = grid.bounds().interior();
    move |pos: &Position, goal: Position| *pos == goal || (interior.contains(pos) && !grid.is_obstacle(pos))
}

pub fn path_to_actions(path: &[Position]) -> Vec<Action> {
    path.windows(2)
        .filter_map(|pair| Action::between(pair[0], pair[1]))
        .collect()
}

fn reconstruct_path(came_from: &HashMap<Position, Position>, mut current: Position) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
