//! Episode loop: phases, option activations, learning and control signals

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::error::ConfigError;
use crate::infra::{Action, ControlSignal, Position, TrainingObserver};
use crate::planners::executor::{ExecutionOutcome, OptionExecutor};
use crate::planners::metrics::{EvaluationMetrics, TrainingMetrics};
use crate::planners::options::{ExecuteOption, TaskOption};
use crate::planners::phase::Phase;
use crate::planners::q_planner::OptionPlanner;
use crate::state::{GridWorld, StartPlacement};

/// One finished episode, as reported to observers and the training log
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub total_reward: f32,
    pub success: bool,
    /// Primitive steps applied across all activations
    pub steps: usize,
    /// Option activations
    pub options: usize,
    pub epsilon: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub summary: EpisodeSummary,
    /// A close signal arrived during the episode
    pub closed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub episodes: usize,
    pub successes: usize,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeMode {
    /// Epsilon-greedy selection with Q updates
    Train,
    /// Best known option every time, no learning
    Greedy,
}

/// Per-episode bookkeeping
#[derive(Debug, Clone)]
struct Episode {
    phase: Phase,
    option_count: usize,
    cumulative_reward: f32,
    primitive_steps: usize,
    steps_without_progress: usize,
    reached_target_once: bool,
}

impl Episode {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            option_count: 0,
            cumulative_reward: 0.0,
            primitive_steps: 0,
            steps_without_progress: 0,
            reached_target_once: false,
        }
    }

    /// Back to the start of the phase sequence after a reset. Budgets keep counting.
    fn restart(&mut self, phase: Phase) {
        self.phase = phase;
        self.steps_without_progress = 0;
        self.reached_target_once = false;
    }

    fn record(&mut self, outcome: &ExecutionOutcome, world: &GridWorld) {
        self.option_count += 1;
        self.cumulative_reward += outcome.reward;
        self.primitive_steps += outcome.steps;
        if outcome.made_progress() {
            self.steps_without_progress = 0;
        } else {
            self.steps_without_progress += 1;
        }
        if world.position() == world.target() {
            self.reached_target_once = true;
        }
    }
}

/// Drives episodes: walks the phase sequence, lets the planner pick an
/// eligible option, executes it and learns from the outcome.
pub struct Trainer {
    config: TrainingConfig,
    world: GridWorld,
    options: Vec<TaskOption>,
    planner: OptionPlanner,
    executor: OptionExecutor,
    metrics: TrainingMetrics,
    rng: StdRng,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = GridWorld::new(config.width, config.height, config.reward.clone())?;
        world.set_start(if config.fixed_start {
            StartPlacement::Fixed(Position::new(0, 0))
        } else {
            StartPlacement::Random
        });
        Self::with_world(config, world)
    }

    /// Trainer over a prepared world. The world is only re-randomized when
    /// an episode is started through [`Trainer::run_episode`] or a reset signal.
    /// The world's reward settings are replaced by `config.reward`.
    pub fn with_world(config: TrainingConfig, world: GridWorld) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = world.with_reward_config(config.reward.clone());
        let options = TaskOption::catalogue();
        let planner = OptionPlanner::new(config.planner.clone(), options.len())?;
        let executor = OptionExecutor::new(config.executor.clone())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            config,
            world,
            options,
            planner,
            executor,
            metrics: TrainingMetrics::default(),
            rng,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn planner(&self) -> &OptionPlanner {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut OptionPlanner {
        &mut self.planner
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Run the configured number of training episodes, or fewer if an observer asks to close.
    pub fn train(&mut self, observer: &mut dyn TrainingObserver) -> TrainingReport {
        info!(
            episodes = self.config.episodes,
            width = self.config.width,
            height = self.config.height,
            "Training started"
        );
        observer.on_training_start(&self.config);

        let mut report = TrainingReport::default();
        for episode in 1..=self.config.episodes {
            let outcome = self.run_episode(episode, observer, EpisodeMode::Train);
            self.metrics.record_episode(&outcome.summary);
            self.planner.decay_epsilon();

            report.episodes += 1;
            if outcome.summary.success {
                report.successes += 1;
            }
            if episode % self.config.log_interval == 0 {
                self.metrics.log_summary(self.planner.epsilon());
            }
            if outcome.closed {
                report.closed = true;
                break;
            }
        }

        observer.on_training_finished(&report);
        info!(
            episodes = report.episodes,
            successes = report.successes,
            states = self.planner.len(),
            "Training finished"
        );
        report
    }

    /// Reset the world and play one episode on it.
    pub fn run_episode(
        &mut self,
        episode: usize,
        observer: &mut dyn TrainingObserver,
        mode: EpisodeMode,
    ) -> EpisodeOutcome {
        self.world.reset(self.config.obstacle_density, &mut self.rng);
        self.play_episode(episode, observer, mode)
    }

    /// Play one episode on the world as it currently is.
    #[tracing::instrument(level = "debug", skip(self, observer))]
    pub fn play_episode(
        &mut self,
        episode: usize,
        observer: &mut dyn TrainingObserver,
        mode: EpisodeMode,
    ) -> EpisodeOutcome {
        let mut state = Episode::new(Phase::initial(&self.world));
        let mut closed = false;
        observer.on_episode_start(episode, &self.world);
        observer.on_phase_changed(state.phase, &self.world);

        while state.option_count < self.config.max_options && state.phase != Phase::Complete {
            match observer.poll_signal() {
                Some(ControlSignal::Close) => {
                    info!(episode, "Close requested");
                    closed = true;
                    break;
                }
                Some(ControlSignal::Reset) => {
                    info!(episode, "Reset requested");
                    self.world.reset(self.config.obstacle_density, &mut self.rng);
                    state.restart(Phase::initial(&self.world));
                    observer.on_phase_changed(state.phase, &self.world);
                    continue;
                }
                None => {}
            }

            let eligible = state.phase.eligible_indices();
            let prev = self.world.clone();
            let index = match mode {
                EpisodeMode::Train => self.planner.select(&self.world, &eligible, &mut self.rng),
                EpisodeMode::Greedy => self.planner.select_greedy(&self.world, &eligible),
            };

            let option = &mut self.options[index];
            option.on_select(&self.world, state.phase.destination(&self.world));
            let name = option.name();
            debug!(episode, option = name, phase = %state.phase, "Option selected");
            observer.on_option_selected(name, &self.world);

            let outcome = self.executor.execute_observed(
                &mut self.world,
                option,
                self.config.max_primitive_steps,
                state.phase,
                |action, reward, world| observer.on_step(action, reward, world),
            );
            if mode == EpisodeMode::Train {
                self.planner
                    .update(&prev, index, outcome.reward, &self.world, self.options.len());
            }
            state.record(&outcome, &self.world);
            observer.on_option_finished(name, &outcome, &self.world);

            let next = state.phase.advance(&self.world);
            if next != state.phase {
                debug!(from = %state.phase, to = %next, "Phase changed");
                state.phase = next;
                observer.on_phase_changed(next, &self.world);
            }

            if self.world.is_task_complete() {
                break;
            }
            if state.steps_without_progress >= self.config.stuck_episode_limit {
                debug!(
                    episode,
                    activations = state.steps_without_progress,
                    "Episode stuck"
                );
                break;
            }
        }

        let summary = EpisodeSummary {
            episode,
            total_reward: state.cumulative_reward,
            success: self.world.is_task_complete(),
            steps: state.primitive_steps,
            options: state.option_count,
            epsilon: match mode {
                EpisodeMode::Train => self.planner.epsilon(),
                EpisodeMode::Greedy => 0.0,
            },
        };
        debug!(
            episode,
            success = summary.success,
            reward = summary.total_reward,
            reached_target = state.reached_target_once,
            "Episode finished"
        );
        observer.on_episode_finished(&summary, &self.world);

        EpisodeOutcome { summary, closed }
    }

    /// Greedy run on a fresh layout, rendering the grid after every activation.
    pub fn demo(&mut self, observer: &mut dyn TrainingObserver) -> EpisodeSummary {
        let mut renderer = DemoRenderer { inner: observer };
        let outcome = self.run_episode(0, &mut renderer, EpisodeMode::Greedy);
        info!(
            success = outcome.summary.success,
            steps = outcome.summary.steps,
            options = outcome.summary.options,
            "Demo finished"
        );
        outcome.summary
    }

    /// Greedy episodes on fresh layouts without learning.
    pub fn evaluate(
        &mut self,
        episodes: usize,
        observer: &mut dyn TrainingObserver,
    ) -> EvaluationMetrics {
        let mut metrics = EvaluationMetrics::new();
        for episode in 1..=episodes {
            let outcome = self.run_episode(episode, observer, EpisodeMode::Greedy);
            metrics.record_episode(&outcome.summary);
            if outcome.closed {
                break;
            }
        }
        metrics
    }
}

/// Prints the grid around each demo activation, then forwards to the wrapped observer.
struct DemoRenderer<'a> {
    inner: &'a mut dyn TrainingObserver,
}

impl TrainingObserver for DemoRenderer<'_> {
    fn on_training_start(&mut self, config: &TrainingConfig) {
        self.inner.on_training_start(config);
    }

    fn on_episode_start(&mut self, episode: usize, world: &GridWorld) {
        info!("Demo start\n{world}");
        self.inner.on_episode_start(episode, world);
    }

    fn on_phase_changed(&mut self, phase: Phase, world: &GridWorld) {
        self.inner.on_phase_changed(phase, world);
    }

    fn on_option_selected(&mut self, option: &str, world: &GridWorld) {
        self.inner.on_option_selected(option, world);
    }

    fn on_step(&mut self, action: Action, reward: f32, world: &GridWorld) {
        self.inner.on_step(action, reward, world);
    }

    fn on_option_finished(&mut self, option: &str, outcome: &ExecutionOutcome, world: &GridWorld) {
        info!("{option} -> {:?} ({:.2})\n{world}", outcome.status, outcome.reward);
        self.inner.on_option_finished(option, outcome, world);
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary, world: &GridWorld) {
        self.inner.on_episode_finished(summary, world);
    }

    fn on_training_finished(&mut self, report: &TrainingReport) {
        self.inner.on_training_finished(report);
    }

    fn poll_signal(&mut self) -> Option<ControlSignal> {
        self.inner.poll_signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingObserver {
        signals: VecDeque<Option<ControlSignal>>,
        episodes_started: usize,
        phases: Vec<Phase>,
        selected: Vec<String>,
        steps: usize,
        summaries: Vec<EpisodeSummary>,
        finished: Option<TrainingReport>,
    }

    impl TrainingObserver for RecordingObserver {
        fn on_episode_start(&mut self, _episode: usize, _world: &GridWorld) {
            self.episodes_started += 1;
        }

        fn on_phase_changed(&mut self, phase: Phase, _world: &GridWorld) {
            self.phases.push(phase);
        }

        fn on_option_selected(&mut self, option: &str, _world: &GridWorld) {
            self.selected.push(option.to_string());
        }

        fn on_step(&mut self, _: Action, _: f32, _: &GridWorld) {
            self.steps += 1;
        }

        fn on_option_finished(&mut self, _: &str, _: &ExecutionOutcome, _: &GridWorld) {}

        fn on_episode_finished(&mut self, summary: &EpisodeSummary, _world: &GridWorld) {
            self.summaries.push(summary.clone());
        }

        fn on_training_finished(&mut self, report: &TrainingReport) {
            self.finished = Some(report.clone());
        }

        fn poll_signal(&mut self) -> Option<ControlSignal> {
            self.signals.pop_front().flatten()
        }
    }

    fn small_config(seed: u64) -> TrainingConfig {
        TrainingConfig {
            width: 6,
            height: 6,
            obstacle_density: 0.1,
            episodes: 15,
            max_options: 10,
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn open_world() -> GridWorld {
        GridWorld::from_layout(
            6,
            6,
            Position::new(0, 0),
            Position::new(5, 5),
            Some(Position::new(2, 2)),
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TrainingConfig {
            max_primitive_steps: 0,
            ..Default::default()
        };
        assert_eq!(
            Trainer::new(config).err(),
            Some(ConfigError::ZeroBudget("max_primitive_steps"))
        );
    }

    #[test]
    fn test_greedy_episode_on_open_grid_succeeds() {
        let mut trainer = Trainer::with_world(small_config(1), open_world()).unwrap();
        let mut observer = RecordingObserver::default();

        let outcome = trainer.play_episode(1, &mut observer, EpisodeMode::Greedy);
        assert!(outcome.summary.success);
        assert!(!outcome.closed);
        assert_eq!(outcome.summary.options, 1);
        assert_eq!(outcome.summary.steps, 10);
        assert_eq!(observer.selected, vec!["MoveToTarget".to_string()]);
        assert_eq!(observer.phases, vec![Phase::MoveToTarget, Phase::Complete]);
        assert_eq!(trainer.planner().len(), 1);
        assert_eq!(observer.steps, 10);
    }

    #[test]
    fn test_greedy_episode_walks_every_phase() {
        let world = GridWorld::from_layout(
            6,
            6,
            Position::new(0, 0),
            Position::new(5, 5),
            Some(Position::new(0, 5)),
            &[],
        )
        .unwrap();
        let mut trainer = Trainer::with_world(small_config(2), world).unwrap();
        let mut observer = RecordingObserver::default();

        let outcome = trainer.play_episode(1, &mut observer, EpisodeMode::Greedy);
        assert!(outcome.summary.success);
        assert!(trainer.world().is_task_complete());
        assert_eq!(
            observer.selected,
            vec!["MoveToTarget", "ReturnToObject", "MoveObjectToTarget"]
        );
        assert_eq!(
            observer.phases,
            vec![
                Phase::MoveToTarget,
                Phase::ReturnToObject,
                Phase::DeliverObject,
                Phase::Complete,
            ]
        );
        assert_eq!(outcome.summary.steps, 20);
        assert_eq!(observer.steps, 20);
    }

    #[test]
    fn test_prepared_world_takes_configured_rewards() {
        let mut config = small_config(4);
        config.reward.completion_bonus = 7.0;
        let trainer = Trainer::with_world(config, open_world()).unwrap();
        assert_eq!(trainer.world().reward_config().completion_bonus, 7.0);
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let run = |seed| {
            let mut trainer = Trainer::new(small_config(seed)).unwrap();
            let mut observer = RecordingObserver::default();
            let report = trainer.train(&mut observer);
            (report, observer.summaries, trainer.planner().export_rows())
        };

        let (report_a, summaries_a, rows_a) = run(42);
        let (report_b, summaries_b, rows_b) = run(42);
        assert_eq!(report_a, report_b);
        assert_eq!(summaries_a, summaries_b);
        assert_eq!(rows_a, rows_b);
        assert_eq!(report_a.episodes, 15);
        assert!(summaries_a.iter().all(|s| s.options <= 10));
    }

    #[test]
    fn test_epsilon_decays_per_episode() {
        let mut trainer = Trainer::new(small_config(3)).unwrap();
        let mut observer = RecordingObserver::default();
        trainer.train(&mut observer);

        let first = observer.summaries[0].epsilon;
        let second = observer.summaries[1].epsilon;
        assert!((second - first * 0.995).abs() < 1e-6);
    }

    #[test]
    fn test_close_signal_stops_training() {
        let mut trainer = Trainer::new(small_config(5)).unwrap();
        let mut observer = RecordingObserver {
            signals: VecDeque::from([Some(ControlSignal::Close)]),
            ..Default::default()
        };

        let report = trainer.train(&mut observer);
        assert!(report.closed);
        assert_eq!(report.episodes, 1);
        assert_eq!(observer.summaries.len(), 1);
        assert_eq!(observer.finished, Some(report));
    }

    #[test]
    fn test_reset_signal_restarts_phases() {
        let mut trainer = Trainer::with_world(small_config(9), open_world()).unwrap();
        let mut observer = RecordingObserver {
            signals: VecDeque::from([Some(ControlSignal::Reset)]),
            ..Default::default()
        };

        let outcome = trainer.play_episode(1, &mut observer, EpisodeMode::Greedy);
        assert_eq!(observer.episodes_started, 1);
        assert!(observer.phases.len() >= 2);
        assert!(outcome.summary.options <= 10);
    }

    #[test]
    fn test_evaluation_counts_episodes() {
        let mut trainer = Trainer::new(small_config(13)).unwrap();
        let mut observer = RecordingObserver::default();
        let metrics = trainer.evaluate(4, &mut observer);
        assert_eq!(metrics.num_episodes, 4);
        assert!(observer.summaries.iter().all(|s| s.epsilon == 0.0));
    }
}
