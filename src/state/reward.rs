//! Per-step reward shaping.

use crate::infra::Position;

/// Reward constants
#[derive(Debug, Clone, PartialEq)]
pub struct RewardConfig {
    /// Terminal bonus for delivering the object to the target
    pub completion_bonus: f32,
    /// Time cost charged on every step
    pub step_penalty: f32,
    /// Charged if the agent ends a step on an obstacle cell
    pub obstacle_penalty: f32,
    /// Manhattan distance to the target strictly decreased
    pub closer_reward: f32,
    /// Manhattan distance to the target strictly increased
    pub farther_penalty: f32,
    /// Manhattan distance to the target unchanged
    pub stall_penalty: f32,
    /// Radius (Manhattan) around the target that earns the proximity bonus
    pub proximity_radius: i32,
    pub proximity_bonus: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            completion_bonus: 100.0,
            step_penalty: -0.1,
            obstacle_penalty: -10.0,
            closer_reward: 1.0,
            farther_penalty: -1.0,
            stall_penalty: -0.2,
            proximity_radius: 2,
            proximity_bonus: 0.5,
        }
    }
}

/// Reward for moving from `prev` to `next`. Depends on nothing but its arguments.
pub fn compute_reward(
    config: &RewardConfig,
    prev: Position,
    next: Position,
    carrying: bool,
    target: Position,
    on_obstacle: bool,
) -> f32 {
    if carrying && next == target {
        return config.completion_bonus;
    }

    let mut reward = config.step_penalty;

    if on_obstacle {
        reward += config.obstacle_penalty;
    }

    let before = prev.distance(&target);
    let after = next.distance(&target);
    reward += match after.cmp(&before) {
        std::cmp::Ordering::Less => config.closer_reward,
        std::cmp::Ordering::Greater => config.farther_penalty,
        std::cmp::Ordering::Equal => config.stall_penalty,
    };

    if after <= config.proximity_radius {
        reward += config.proximity_bonus;
    }

    reward
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_away_costs_only_distance_and_time() {
        let config = RewardConfig::default();
        let target = Position::new(9, 9);
        let reward = compute_reward(
            &config,
            Position::new(2, 2),
            Position::new(1, 2),
            false,
            target,
            false,
        );
        assert_eq!(reward, config.farther_penalty + config.step_penalty);
    }

    #[test]
    fn test_completion_is_terminal_signal() {
        let config = RewardConfig::default();
        let target = Position::new(3, 3);
        let reward = compute_reward(&config, Position::new(3, 2), target, true, target, false);
        assert_eq!(reward, config.completion_bonus);

        // Reaching the target without the object is just a shaped step
        let reward = compute_reward(&config, Position::new(3, 2), target, false, target, false);
        assert_eq!(
            reward,
            config.step_penalty + config.closer_reward + config.proximity_bonus
        );
    }

    #[test]
    fn test_obstacle_and_stall_terms() {
        let config = RewardConfig::default();
        let target = Position::new(9, 0);
        let here = Position::new(0, 9);
        let reward = compute_reward(&config, here, here, false, target, true);
        assert_eq!(
            reward,
            config.step_penalty + config.obstacle_penalty + config.stall_penalty
        );
    }
}
