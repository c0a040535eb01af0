use std::sync::{Arc, Mutex, mpsc};

use crate::config::TrainingConfig;
use crate::infra::{Action, ControlSignal, TrainingObserver};
use crate::planners::{EpisodeSummary, ExecutionOutcome, Phase};
use crate::state::GridWorld;

/// What the visualizer draws. `version` changes on every update.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub world: GridWorld,
    pub episode: usize,
    pub phase: Phase,
    pub reward: f32,
    pub epsilon: f32,
    pub version: u64,
}

/// Publishes a snapshot for the visualizer after every primitive step and
/// episode event, and relays its key presses.
pub struct VisualizingObserver {
    shared_state: Arc<Mutex<Option<Snapshot>>>,
    signals: mpsc::Receiver<ControlSignal>,
    episode: usize,
    phase: Phase,
    reward: f32,
    /// Episode reward before the running option started
    option_base: f32,
    epsilon: f32,
    version: u64,
}

impl VisualizingObserver {
    pub fn new(
        shared_state: Arc<Mutex<Option<Snapshot>>>,
        signals: mpsc::Receiver<ControlSignal>,
    ) -> Self {
        Self {
            shared_state,
            signals,
            episode: 0,
            phase: Phase::ClearObstacles,
            reward: 0.0,
            option_base: 0.0,
            epsilon: 0.0,
            version: 0,
        }
    }

    fn publish(&mut self, world: &GridWorld) {
        self.version += 1;
        if let Ok(mut state) = self.shared_state.lock() {
            *state = Some(Snapshot {
                world: world.clone(),
                episode: self.episode,
                phase: self.phase,
                reward: self.reward,
                epsilon: self.epsilon,
                version: self.version,
            });
        } else {
            tracing::warn!("Failed to lock shared state for update");
        }
    }
}

impl TrainingObserver for VisualizingObserver {
    fn on_training_start(&mut self, config: &TrainingConfig) {
        self.epsilon = config.planner.epsilon;
    }

    fn on_episode_start(&mut self, episode: usize, world: &GridWorld) {
        self.episode = episode;
        self.reward = 0.0;
        self.publish(world);
    }

    fn on_phase_changed(&mut self, phase: Phase, world: &GridWorld) {
        self.phase = phase;
        self.publish(world);
    }

    fn on_option_selected(&mut self, _option: &str, _world: &GridWorld) {
        self.option_base = self.reward;
    }

    fn on_step(&mut self, _action: Action, reward: f32, world: &GridWorld) {
        self.reward += reward;
        self.publish(world);
    }

    /// The outcome adds clearing and penalty terms the steps did not carry.
    fn on_option_finished(&mut self, _option: &str, outcome: &ExecutionOutcome, world: &GridWorld) {
        self.reward = self.option_base + outcome.reward;
        self.publish(world);
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary, world: &GridWorld) {
        self.epsilon = summary.epsilon;
        self.reward = summary.total_reward;
        self.publish(world);
    }

    fn poll_signal(&mut self) -> Option<ControlSignal> {
        self.signals.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planners::ExecutionStatus;

    #[test]
    fn test_publishes_snapshots_and_relays_signals() {
        let shared = Arc::new(Mutex::new(None));
        let (tx, rx) = mpsc::channel();
        let mut observer = VisualizingObserver::new(Arc::clone(&shared), rx);
        let world = GridWorld::new(4, 4, Default::default()).unwrap();

        observer.on_episode_start(2, &world);
        observer.on_phase_changed(Phase::MoveToTarget, &world);
        {
            let state = shared.lock().unwrap();
            let snapshot = state.as_ref().unwrap();
            assert_eq!(snapshot.episode, 2);
            assert_eq!(snapshot.phase, Phase::MoveToTarget);
            assert_eq!(snapshot.version, 2);
        }

        assert_eq!(observer.poll_signal(), None);
        tx.send(ControlSignal::Reset).unwrap();
        assert_eq!(observer.poll_signal(), Some(ControlSignal::Reset));
    }

    #[test]
    fn test_every_step_publishes_a_snapshot() {
        let shared = Arc::new(Mutex::new(None));
        let (_tx, rx) = mpsc::channel();
        let mut observer = VisualizingObserver::new(Arc::clone(&shared), rx);
        let mut world = GridWorld::new(4, 4, Default::default()).unwrap();

        observer.on_episode_start(1, &world);
        observer.on_option_selected("MoveToTarget", &world);
        let mut total = 0.0;
        for action in [Action::Right, Action::Down] {
            let reward = world.step(action);
            total += reward;
            observer.on_step(action, reward, &world);

            let state = shared.lock().unwrap();
            let snapshot = state.as_ref().unwrap();
            assert_eq!(snapshot.world.position(), world.position());
            assert!((snapshot.reward - total).abs() < 1e-6);
        }
        assert_eq!(shared.lock().unwrap().as_ref().unwrap().version, 3);

        // The finished option's reward replaces the running step sum
        let outcome = ExecutionOutcome {
            reward: total + 2.0,
            steps: 2,
            status: ExecutionStatus::Exhausted,
            cleared: None,
            moved: true,
        };
        observer.on_option_finished("MoveToTarget", &outcome, &world);
        let state = shared.lock().unwrap();
        assert!((state.as_ref().unwrap().reward - (total + 2.0)).abs() < 1e-6);
    }
}
