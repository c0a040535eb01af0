use tracing::{debug, info, trace};

use crate::config::TrainingConfig;
use crate::infra::{Action, TrainingObserver};
use crate::planners::{EpisodeSummary, ExecutionOutcome, Phase, TrainingReport};
use crate::state::GridWorld;

/// Logs training events through `tracing`.
pub struct DefaultObserver;

impl TrainingObserver for DefaultObserver {
    fn on_training_start(&mut self, config: &TrainingConfig) {
        info!(
            "Training on {}x{} grid, density {:.2}, {} episodes",
            config.width, config.height, config.obstacle_density, config.episodes
        );
        if let Some(seed) = config.seed {
            info!("- seed: {}", seed);
        }
        info!(
            "- alpha {} gamma {} epsilon {} (decay {}, min {})",
            config.planner.alpha,
            config.planner.gamma,
            config.planner.epsilon,
            config.planner.epsilon_decay,
            config.planner.epsilon_min
        );
    }

    fn on_episode_start(&mut self, episode: usize, world: &GridWorld) {
        debug!(
            "Episode {} started: agent {}, target {}, obstacles {}",
            episode,
            world.position(),
            world.target(),
            world.obstacle_count()
        );
        trace!("\n{}", world);
    }

    fn on_phase_changed(&mut self, phase: Phase, _world: &GridWorld) {
        debug!("Phase: {}", phase);
    }

    fn on_option_selected(&mut self, option: &str, world: &GridWorld) {
        debug!("Option: {} at {}", option, world.position());
    }

    fn on_step(&mut self, action: Action, reward: f32, world: &GridWorld) {
        trace!("{} -> {} ({:.2})", action.as_str(), world.position(), reward);
    }

    fn on_option_finished(&mut self, option: &str, outcome: &ExecutionOutcome, world: &GridWorld) {
        debug!(
            "{} finished: {:?}, {} steps, reward {:.2}, now at {}",
            option,
            outcome.status,
            outcome.steps,
            outcome.reward,
            world.position()
        );
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary, _world: &GridWorld) {
        debug!(
            "Episode {} finished: success {}, reward {:.2}, {} options, {} steps",
            summary.episode, summary.success, summary.total_reward, summary.options, summary.steps
        );
    }

    fn on_training_finished(&mut self, report: &TrainingReport) {
        info!(
            "Training finished after {} episodes ({} successful)",
            report.episodes, report.successes
        );
    }
}
