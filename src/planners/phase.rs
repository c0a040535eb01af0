use std::fmt;

use crate::infra::Position;
use crate::planners::options::OptionKind;
use crate::state::GridWorld;

/// Stage of an episode. Each phase restricts which options may be selected
/// and names the destination obstacle clearing works toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    ClearObstacles,
    MoveToTarget,
    ReturnToObject,
    DeliverObject,
    Complete,
}

impl Phase {
    pub const SEQUENCE: [Phase; 5] = [
        Phase::ClearObstacles,
        Phase::MoveToTarget,
        Phase::ReturnToObject,
        Phase::DeliverObject,
        Phase::Complete,
    ];

    /// First phase of a fresh episode, skipping any that already hold.
    pub fn initial(world: &GridWorld) -> Phase {
        Phase::ClearObstacles.advance(world)
    }

    pub fn successor(self) -> Phase {
        match self {
            Phase::ClearObstacles => Phase::MoveToTarget,
            Phase::MoveToTarget => Phase::ReturnToObject,
            Phase::ReturnToObject => Phase::DeliverObject,
            Phase::DeliverObject | Phase::Complete => Phase::Complete,
        }
    }

    /// Whether this phase's exit condition holds.
    pub fn is_satisfied(self, world: &GridWorld) -> bool {
        match self {
            Phase::ClearObstacles => world.is_carrying() || !world.has_obstacle_neighbor(),
            Phase::MoveToTarget => world.is_carrying() || world.position() == world.target(),
            Phase::ReturnToObject => world.is_carrying(),
            Phase::DeliverObject => world.is_task_complete(),
            Phase::Complete => true,
        }
    }

    /// Moves forward past every satisfied phase. Never moves backward.
    pub fn advance(self, world: &GridWorld) -> Phase {
        let mut phase = self;
        while phase != Phase::Complete && phase.is_satisfied(world) {
            phase = phase.successor();
        }
        phase
    }

    pub fn eligible(self) -> &'static [OptionKind] {
        match self {
            Phase::ClearObstacles => &[OptionKind::ClearObstacle],
            Phase::MoveToTarget => &[OptionKind::MoveToTarget, OptionKind::ClearObstacle],
            Phase::ReturnToObject => &[
                OptionKind::ReturnToObject,
                OptionKind::MoveToObject,
                OptionKind::ClearObstacle,
            ],
            Phase::DeliverObject => &[OptionKind::MoveObjectToTarget, OptionKind::MoveToTarget],
            Phase::Complete => &[],
        }
    }

    pub fn eligible_indices(self) -> Vec<usize> {
        self.eligible().iter().map(|kind| kind.index()).collect()
    }

    /// Where obstacle clearing should make progress toward in this phase.
    pub fn destination(self, world: &GridWorld) -> Position {
        match self {
            Phase::MoveToTarget | Phase::DeliverObject | Phase::Complete => world.target(),
            Phase::ClearObstacles | Phase::ReturnToObject => world.current_destination(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::ClearObstacles => "ClearObstacles",
            Phase::MoveToTarget => "MoveToTarget",
            Phase::ReturnToObject => "ReturnToObject",
            Phase::DeliverObject => "DeliverObject",
            Phase::Complete => "Complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Action;

    fn world(obstacles: &[Position]) -> GridWorld {
        GridWorld::from_layout(
            5,
            5,
            Position::new(0, 0),
            Position::new(2, 0),
            Some(Position::new(1, 0)),
            obstacles,
        )
        .unwrap()
    }

    #[test]
    fn test_satisfied_phases_are_skipped() {
        let open = world(&[]);
        assert_eq!(Phase::initial(&open), Phase::MoveToTarget);

        let blocked = world(&[Position::new(0, 1)]);
        assert_eq!(Phase::initial(&blocked), Phase::ClearObstacles);
    }

    #[test]
    fn test_phases_follow_task_progress() {
        let mut world = world(&[]);
        let mut phase = Phase::initial(&world);

        world.step(Action::Right);
        assert!(world.is_carrying());
        phase = phase.advance(&world);
        assert_eq!(phase, Phase::DeliverObject);
        assert_eq!(phase.destination(&world), world.target());

        world.step(Action::Right);
        assert_eq!(phase.advance(&world), Phase::Complete);
        assert!(Phase::Complete.eligible().is_empty());
    }

    #[test]
    fn test_every_active_phase_offers_an_option() {
        for phase in Phase::SEQUENCE {
            if phase != Phase::Complete {
                assert!(!phase.eligible_indices().is_empty(), "{phase} has no options");
            }
        }
    }
}
