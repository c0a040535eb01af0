use crate::config::TrainingConfig;
use crate::infra::{Action, ControlSignal, TrainingObserver};
use crate::planners::{EpisodeSummary, ExecutionOutcome, Phase, TrainingReport};
use crate::state::GridWorld;

/// Fans every event out to several observers.
pub struct CompositeObserver {
    observers: Vec<Box<dyn TrainingObserver + Send>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn TrainingObserver + Send>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Box<dyn TrainingObserver + Send>) {
        self.observers.push(observer);
    }
}

impl TrainingObserver for CompositeObserver {
    fn on_training_start(&mut self, config: &TrainingConfig) {
        for observer in &mut self.observers {
            observer.on_training_start(config);
        }
    }

    fn on_episode_start(&mut self, episode: usize, world: &GridWorld) {
        for observer in &mut self.observers {
            observer.on_episode_start(episode, world);
        }
    }

    fn on_phase_changed(&mut self, phase: Phase, world: &GridWorld) {
        for observer in &mut self.observers {
            observer.on_phase_changed(phase, world);
        }
    }

    fn on_option_selected(&mut self, option: &str, world: &GridWorld) {
        for observer in &mut self.observers {
            observer.on_option_selected(option, world);
        }
    }

    fn on_step(&mut self, action: Action, reward: f32, world: &GridWorld) {
        for observer in &mut self.observers {
            observer.on_step(action, reward, world);
        }
    }

    fn on_option_finished(&mut self, option: &str, outcome: &ExecutionOutcome, world: &GridWorld) {
        for observer in &mut self.observers {
            observer.on_option_finished(option, outcome, world);
        }
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary, world: &GridWorld) {
        for observer in &mut self.observers {
            observer.on_episode_finished(summary, world);
        }
    }

    fn on_training_finished(&mut self, report: &TrainingReport) {
        for observer in &mut self.observers {
            observer.on_training_finished(report);
        }
    }

    /// Every observer is polled so none keeps a stale signal; the first one raised wins.
    fn poll_signal(&mut self) -> Option<ControlSignal> {
        let mut signal = None;
        for observer in &mut self.observers {
            let raised = observer.poll_signal();
            if signal.is_none() {
                signal = raised;
            }
        }
        signal
    }
}
