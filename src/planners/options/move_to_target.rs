use crate::infra::{Action, Position};
use crate::state::GridWorld;

use super::ExecuteOption;
use super::helpers::navigate;
use super::loop_guard::LoopGuard;

/// Walk to the target cell, carrying or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveToTargetOption {
    guard: LoopGuard,
}

impl ExecuteOption for MoveToTargetOption {
    fn name(&self) -> &'static str {
        "MoveToTarget"
    }

    fn on_select(&mut self, _world: &GridWorld, _destination: Position) {
        self.guard.reset();
    }

    fn is_complete(&self, world: &GridWorld) -> bool {
        world.position() == world.target()
    }

    fn policy(&self, world: &GridWorld) -> Action {
        navigate(world, world.target(), &self.guard)
    }

    fn record(&mut self, action: Action, _world: &GridWorld) {
        self.guard.record(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::PathPlanner;

    #[test]
    fn test_heads_for_target_and_completes_there() {
        let mut world = GridWorld::from_layout(
            5,
            5,
            Position::new(0, 0),
            Position::new(4, 1),
            Some(Position::new(0, 4)),
            &[],
        )
        .unwrap();
        let mut option = MoveToTargetOption::default();
        option.on_select(&world, world.target());

        let mut ticks = 0;
        while !option.is_complete(&world) {
            let action = option.policy(&world);
            world.step(action);
            option.record(action, &world);
            ticks += 1;
            assert!(ticks <= 5);
        }
        assert_eq!(ticks, 5);
        assert_eq!(option.policy(&world), Action::None);
    }

    #[test]
    fn test_detours_when_greedy_move_is_blocked() {
        // Wall between agent and target with a gap at the bottom
        let world = GridWorld::from_layout(
            5,
            3,
            Position::new(1, 0),
            Position::new(4, 0),
            Some(Position::new(0, 2)),
            &[Position::new(2, 0), Position::new(2, 1)],
        )
        .unwrap();
        let option = MoveToTargetOption::default();
        let action = option.policy(&world);
        assert!(matches!(action, Action::Up | Action::Down));
        assert_eq!(option.policy(&world), action);
    }

    #[test]
    fn test_repeated_actions_switch_to_exact_search_for_one_tick() {
        let world = GridWorld::from_layout(
            5,
            5,
            Position::new(1, 2),
            Position::new(3, 0),
            Some(Position::new(0, 4)),
            &[],
        )
        .unwrap();
        let mut option = MoveToTargetOption::default();
        option.on_select(&world, world.target());

        let greedy = option.policy(&world);
        let exact = PathPlanner::next_step(world.grid(), world.position(), world.target(), true);
        assert_eq!(greedy, Action::Right);
        assert_eq!(exact, Some(Action::Up));

        for _ in 0..3 {
            option.record(Action::Right, &world);
        }
        assert_eq!(option.policy(&world), Action::Up);

        // The exact-search tick starts a fresh window
        option.record(Action::Up, &world);
        assert_eq!(option.policy(&world), Action::Right);
    }
}
