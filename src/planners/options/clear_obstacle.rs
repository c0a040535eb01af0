use crate::infra::{Action, PathPlanner, Position};
use crate::state::GridWorld;

use super::ExecuteOption;
use super::helpers::strategic_obstacle;

/// Steps toward the current destination until an obstacle worth clearing is
/// adjacent, then yields [`Action::None`] to request the clear.
///
/// Clearing while carrying the object is not allowed; the option is complete
/// as soon as the object is held.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearObstacleOption {
    destination: Option<Position>,
}

impl ClearObstacleOption {
    pub fn destination(&self, world: &GridWorld) -> Position {
        self.destination
            .unwrap_or_else(|| world.current_destination())
    }
}

impl ExecuteOption for ClearObstacleOption {
    fn name(&self) -> &'static str {
        "ClearObstacle"
    }

    fn on_select(&mut self, _world: &GridWorld, destination: Position) {
        self.destination = Some(destination);
    }

    fn is_complete(&self, world: &GridWorld) -> bool {
        world.is_carrying() || !world.has_obstacle_neighbor()
    }

    fn policy(&self, world: &GridWorld) -> Action {
        if world.is_carrying() {
            return Action::None;
        }

        let destination = self.destination(world);
        if strategic_obstacle(world, destination).is_some() {
            return Action::None;
        }

        PathPlanner::smart_step(world.grid(), world.position(), destination)
            .unwrap_or(Action::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed_in() -> GridWorld {
        GridWorld::from_layout(
            5,
            5,
            Position::new(2, 2),
            Position::new(4, 4),
            Some(Position::new(0, 0)),
            &[
                Position::new(2, 1),
                Position::new(3, 2),
                Position::new(2, 3),
                Position::new(1, 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_boxed_in_agent_requests_clear() {
        let mut world = boxed_in();
        let mut option = ClearObstacleOption::default();
        option.on_select(&world, world.current_destination());

        assert!(!option.is_complete(&world));
        assert_eq!(option.policy(&world), Action::None);

        let before = world.adjacent_obstacles().len();
        assert!(world.clear_adjacent_obstacle());
        assert_eq!(world.adjacent_obstacles().len(), before - 1);
    }

    #[test]
    fn test_moves_when_adjacent_obstacle_is_behind() {
        // Only obstacle is to the east, destination is west
        let world = GridWorld::from_layout(
            5,
            5,
            Position::new(2, 2),
            Position::new(4, 4),
            Some(Position::new(0, 2)),
            &[Position::new(3, 2)],
        )
        .unwrap();
        let mut option = ClearObstacleOption::default();
        option.on_select(&world, world.current_destination());
        assert_eq!(option.policy(&world), Action::Left);
    }

    #[test]
    fn test_complete_while_carrying() {
        let mut world = GridWorld::from_layout(
            5,
            5,
            Position::new(1, 1),
            Position::new(4, 4),
            Some(Position::new(2, 1)),
            &[Position::new(3, 1)],
        )
        .unwrap();
        world.step(Action::Right);
        assert!(world.is_carrying());
        assert!(world.has_obstacle_neighbor());

        let option = ClearObstacleOption::default();
        assert!(option.is_complete(&world));
        assert_eq!(option.policy(&world), Action::None);
    }
}
