use crate::infra::{Action, Position};
use crate::state::GridWorld;

use super::ExecuteOption;
use super::helpers::navigate;
use super::loop_guard::LoopGuard;

/// Carries the object to the target.
///
/// On selection it takes the route the agent walked to reach the object and
/// replays it backwards as waypoints. Once the waypoints run out, or if no
/// route was recorded, it navigates to the target directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveObjectToTargetOption {
    waypoints: Vec<Position>,
    next_waypoint: usize,
    guard: LoopGuard,
}

impl MoveObjectToTargetOption {
    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints[self.next_waypoint.min(self.waypoints.len())..]
    }

    fn advance_past(&mut self, position: Position) {
        let reached = self.waypoints().iter().position(|&p| p == position);
        if let Some(i) = reached {
            self.next_waypoint += i + 1;
        }
    }
}

impl ExecuteOption for MoveObjectToTargetOption {
    fn name(&self) -> &'static str {
        "MoveObjectToTarget"
    }

    fn on_select(&mut self, world: &GridWorld, _destination: Position) {
        self.guard.reset();
        self.next_waypoint = 0;
        self.waypoints = if world.is_carrying() {
            world.approach_route().iter().rev().copied().collect()
        } else {
            Vec::new()
        };
        self.advance_past(world.position());
    }

    fn is_complete(&self, world: &GridWorld) -> bool {
        world.is_task_complete()
    }

    fn policy(&self, world: &GridWorld) -> Action {
        let here = world.position();
        let waypoint = self.waypoints().iter().copied().find(|&p| p != here);
        match waypoint {
            Some(next) if here.is_adjacent(&next) && !world.is_obstacle(&next) => {
                Action::between(here, next).unwrap_or(Action::None)
            }
            Some(next) => navigate(world, next, &self.guard),
            None => navigate(world, world.target(), &self.guard),
        }
    }

    fn record(&mut self, action: Action, world: &GridWorld) {
        self.guard.record(action);
        self.advance_past(world.position());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::PathPlanner;

    fn run_to_completion(option: &mut MoveObjectToTargetOption, world: &mut GridWorld) -> usize {
        let mut ticks = 0;
        while !option.is_complete(world) {
            let action = option.policy(world);
            world.step(action);
            option.record(action, world);
            ticks += 1;
            assert!(ticks <= 30, "did not reach target");
        }
        ticks
    }

    #[test]
    fn test_replays_walked_route_not_shortest_path() {
        let mut world = GridWorld::from_layout(
            5,
            5,
            Position::new(1, 1),
            Position::new(4, 0),
            Some(Position::new(4, 4)),
            &[],
        )
        .unwrap();
        for action in [
            Action::Down,
            Action::Down,
            Action::Down,
            Action::Right,
            Action::Right,
            Action::Right,
        ] {
            world.step(action);
        }
        assert!(world.is_carrying());

        let mut option = MoveObjectToTargetOption::default();
        option.on_select(&world, world.target());
        assert_eq!(
            option.waypoints(),
            &[
                Position::new(3, 4),
                Position::new(2, 4),
                Position::new(1, 4),
                Position::new(1, 3),
                Position::new(1, 2),
                Position::new(1, 1),
            ]
        );
        let shortest =
            PathPlanner::find_path(world.grid(), world.position(), world.target(), |_, _| true)
                .unwrap();
        assert_ne!(shortest.get(1), option.waypoints().first());

        // Six waypoints back, then four steps from (1, 1) to the target
        assert_eq!(run_to_completion(&mut option, &mut world), 10);
        assert!(world.is_task_complete());
    }

    #[test]
    fn test_route_from_target_leads_back_to_it() {
        let mut world = GridWorld::from_layout(
            5,
            5,
            Position::new(4, 3),
            Position::new(4, 4),
            Some(Position::new(1, 2)),
            &[Position::new(2, 3), Position::new(3, 3)],
        )
        .unwrap();
        // Touch the target, then walk round the wall to the object
        for action in [
            Action::Down,
            Action::Up,
            Action::Up,
            Action::Left,
            Action::Left,
            Action::Left,
        ] {
            world.step(action);
        }
        assert!(world.is_carrying());

        let mut option = MoveObjectToTargetOption::default();
        option.on_select(&world, world.target());
        assert_eq!(option.waypoints().last(), Some(&world.target()));
        assert_eq!(option.waypoints().len(), 5);

        assert_eq!(run_to_completion(&mut option, &mut world), 5);
        assert!(world.is_task_complete());
    }

    #[test]
    fn test_no_route_falls_back_to_navigation() {
        let mut world = GridWorld::from_layout(
            5,
            5,
            Position::new(0, 0),
            Position::new(4, 4),
            Some(Position::new(1, 0)),
            &[],
        )
        .unwrap();
        let mut option = MoveObjectToTargetOption::default();
        option.on_select(&world, world.target());
        assert!(option.waypoints().is_empty());
        assert_eq!(option.policy(&world), Action::Right);

        world.step(Action::Right);
        assert!(world.is_carrying());
        option.on_select(&world, world.target());
        // Only the start cell lies behind the pickup cell
        assert_eq!(option.waypoints(), &[Position::new(0, 0)]);
    }

    #[test]
    fn test_policy_does_not_mutate() {
        let mut world = GridWorld::from_layout(
            4,
            4,
            Position::new(0, 0),
            Position::new(3, 3),
            Some(Position::new(1, 0)),
            &[],
        )
        .unwrap();
        world.step(Action::Right);
        let mut option = MoveObjectToTargetOption::default();
        option.on_select(&world, world.target());

        let snapshot = option.clone();
        let first = option.policy(&world);
        assert_eq!(option.policy(&world), first);
        assert_eq!(option, snapshot);
    }
}
