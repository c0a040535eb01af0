//! Option executor - runs one option until it terminates

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::infra::Action;
use crate::planners::options::{ExecuteOption, TaskOption, strategic_obstacle};
use crate::planners::phase::Phase;
use crate::state::GridWorld;

/// Reward shaping and abort thresholds for option execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Consecutive ticks without movement before the option is aborted
    pub stuck_limit: usize,
    /// Added once when the stuck limit trips
    pub deadlock_penalty: f32,
    /// Abort when accumulated option reward drops below this
    pub runaway_threshold: f32,
    /// Clearing an obstacle that lies toward the destination
    pub strategic_clear_reward: f32,
    /// Clearing whichever obstacle is adjacent
    pub opportunistic_clear_reward: f32,
    /// Clearer terminated next to an obstacle it could not clear
    pub failed_clear_penalty: f32,
    /// Non-clearing option that ended where it started
    pub wasted_activation_penalty: f32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            stuck_limit: 3,
            deadlock_penalty: -5.0,
            runaway_threshold: -50.0,
            strategic_clear_reward: 2.0,
            opportunistic_clear_reward: 0.5,
            failed_clear_penalty: -1.0,
            wasted_activation_penalty: -0.5,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stuck_limit == 0 {
            return Err(ConfigError::ZeroBudget("stuck_limit"));
        }
        Ok(())
    }
}

/// Why the primitive loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The option's completion predicate held
    Complete,
    /// The primitive-step budget ran out
    Exhausted,
    /// No movement for `stuck_limit` consecutive ticks
    Deadlocked,
    /// Accumulated reward fell below the runaway threshold
    Runaway,
    /// The obstacle clearer yielded no move
    ClearRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearKind {
    Strategic,
    Opportunistic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub reward: f32,
    /// Primitive steps actually applied to the world
    pub steps: usize,
    pub status: ExecutionStatus,
    pub cleared: Option<ClearKind>,
    /// Whether the agent ended on a different cell than it started on
    pub moved: bool,
}

impl ExecutionOutcome {
    /// Something changed in the world: the agent moved or an obstacle went away.
    pub fn made_progress(&self) -> bool {
        self.moved || self.cleared.is_some()
    }
}

/// Runs an option's policy against the world, one primitive step per tick.
#[derive(Debug, Clone)]
pub struct OptionExecutor {
    config: ExecutorConfig,
}

impl OptionExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `option` for at most `max_steps` primitive steps.
    ///
    /// The option must already have been selected (`on_select` called).
    pub fn execute(
        &self,
        world: &mut GridWorld,
        option: &mut TaskOption,
        max_steps: usize,
        phase: Phase,
    ) -> ExecutionOutcome {
        self.execute_observed(world, option, max_steps, phase, |_, _, _| {})
    }

    /// Like [`OptionExecutor::execute`], calling `on_step` with the action,
    /// its reward and the updated world after every primitive step.
    #[tracing::instrument(level = "debug", skip(self, world, option, on_step), fields(option = option.name()))]
    pub fn execute_observed<F>(
        &self,
        world: &mut GridWorld,
        option: &mut TaskOption,
        max_steps: usize,
        phase: Phase,
        mut on_step: F,
    ) -> ExecutionOutcome
    where
        F: FnMut(Action, f32, &GridWorld),
    {
        let start = world.position();
        let mut reward = 0.0;
        let mut steps = 0;
        let mut stuck_ticks = 0;
        let mut status = ExecutionStatus::Exhausted;

        for _ in 0..max_steps {
            if option.is_complete(world) {
                status = ExecutionStatus::Complete;
                break;
            }

            let action = option.policy(world);
            if action == Action::None && option.is_obstacle_clearer() {
                status = ExecutionStatus::ClearRequested;
                break;
            }

            let before = world.position();
            let step_reward = world.step(action);
            reward += step_reward;
            steps += 1;
            option.record(action, world);
            on_step(action, step_reward, world);

            if world.position() == before {
                stuck_ticks += 1;
                if stuck_ticks >= self.config.stuck_limit {
                    trace!(ticks = stuck_ticks, "Option deadlocked");
                    reward += self.config.deadlock_penalty;
                    status = ExecutionStatus::Deadlocked;
                    break;
                }
            } else {
                stuck_ticks = 0;
            }

            if reward < self.config.runaway_threshold {
                trace!(reward, "Option reward ran away");
                status = ExecutionStatus::Runaway;
                break;
            }
        }

        if status == ExecutionStatus::Exhausted && option.is_complete(world) {
            status = ExecutionStatus::Complete;
        }

        let mut cleared = None;
        if option.is_obstacle_clearer() {
            if world.has_obstacle_neighbor() {
                let (clear, bonus) = self.clear_after(world, phase);
                cleared = clear;
                reward += bonus;
            }
        } else if world.position() == start {
            reward += self.config.wasted_activation_penalty;
        }

        let outcome = ExecutionOutcome {
            reward,
            steps,
            status,
            cleared,
            moved: world.position() != start,
        };
        debug!(
            status = ?outcome.status,
            reward = outcome.reward,
            steps = outcome.steps,
            cleared = ?outcome.cleared,
            "Option finished"
        );
        outcome
    }

    /// Clear one adjacent obstacle, preferring one toward the phase destination.
    fn clear_after(&self, world: &mut GridWorld, phase: Phase) -> (Option<ClearKind>, f32) {
        if world.is_carrying() {
            return (None, self.config.failed_clear_penalty);
        }

        let destination = phase.destination(world);
        if let Some(cell) = strategic_obstacle(world, destination)
            && world.clear_obstacle_at(cell)
        {
            return (Some(ClearKind::Strategic), self.config.strategic_clear_reward);
        }
        if world.clear_adjacent_obstacle() {
            return (
                Some(ClearKind::Opportunistic),
                self.config.opportunistic_clear_reward,
            );
        }
        (None, self.config.failed_clear_penalty)
    }
}
