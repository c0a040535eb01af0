use crate::config::TrainingConfig;
use crate::infra::Action;
use crate::planners::{EpisodeSummary, ExecutionOutcome, Phase, TrainingReport};
use crate::state::GridWorld;

/// Requests an observer can send back to the training loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Stop training once the current episode is recorded
    Close,
    /// Re-randomize the world and restart the phase sequence
    Reset,
}

/// Trait for observing training events
pub trait TrainingObserver {
    /// Called once before the first episode
    fn on_training_start(&mut self, _config: &TrainingConfig) {}

    /// Called when an episode starts, after the world has been reset
    fn on_episode_start(&mut self, episode: usize, world: &GridWorld);

    /// Called when the episode enters a new phase (including the first)
    fn on_phase_changed(&mut self, _phase: Phase, _world: &GridWorld) {}

    /// Called when the planner picks an option
    fn on_option_selected(&mut self, _option: &str, _world: &GridWorld) {}

    /// Called after every primitive step of the running option
    fn on_step(&mut self, _action: Action, _reward: f32, _world: &GridWorld) {}

    /// Called when an option activation terminates
    fn on_option_finished(&mut self, option: &str, outcome: &ExecutionOutcome, world: &GridWorld);

    /// Called when an episode ends
    fn on_episode_finished(&mut self, summary: &EpisodeSummary, world: &GridWorld);

    /// Called once after the last episode
    fn on_training_finished(&mut self, _report: &TrainingReport) {}

    /// Polled once per option activation
    fn poll_signal(&mut self) -> Option<ControlSignal> {
        None
    }
}
