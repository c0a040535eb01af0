use std::fs::File;
use std::path::Path;

use tracing::warn;

use crate::error::PersistenceError;
use crate::infra::TrainingObserver;
use crate::infra::persistence::TrainingLog;
use crate::planners::{EpisodeSummary, ExecutionOutcome};
use crate::state::GridWorld;

/// Writes the training log, one row per finished episode.
pub struct CsvObserver {
    log: TrainingLog<File>,
    failed: bool,
}

impl CsvObserver {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        Ok(Self {
            log: TrainingLog::create(path)?,
            failed: false,
        })
    }
}

impl TrainingObserver for CsvObserver {
    fn on_episode_start(&mut self, _episode: usize, _world: &GridWorld) {}

    fn on_option_finished(&mut self, _: &str, _: &ExecutionOutcome, _: &GridWorld) {}

    fn on_episode_finished(&mut self, summary: &EpisodeSummary, _world: &GridWorld) {
        if self.failed {
            return;
        }
        if let Err(e) = self.log.append(summary) {
            warn!("Training log write failed, disabling: {}", e);
            self.failed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_rows_follow_episodes() {
        let dir = TempDir::new("courier").unwrap();
        let path = dir.path().join("training.csv");
        let world = GridWorld::new(3, 3, Default::default()).unwrap();

        let mut observer = CsvObserver::create(&path).unwrap();
        for episode in 1..=2 {
            observer.on_episode_finished(
                &EpisodeSummary {
                    episode,
                    total_reward: -1.5,
                    success: false,
                    steps: 20,
                    options: 2,
                    epsilon: 0.3,
                },
                &world,
            );
        }

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "2,-1.5,0,20,2,0.3");
    }
}
