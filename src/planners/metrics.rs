//! Running statistics for training and greedy evaluation

use std::collections::VecDeque;
use std::time::Instant;

use super::trainer::EpisodeSummary;

/// Moving average over the last `window` values
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f32>,
    window: usize,
    sum: f32,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            values: VecDeque::with_capacity(window),
            window,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.window
            && let Some(old) = self.values.pop_front()
        {
            self.sum -= old;
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Training progress tracker
#[derive(Debug)]
pub struct TrainingMetrics {
    pub episode_rewards: MovingAverage,
    /// Primitive steps per episode
    pub episode_steps: MovingAverage,
    /// Option activations per episode
    pub episode_options: MovingAverage,
    pub success_rate: MovingAverage,
    pub episodes: usize,
    pub successes: usize,
    pub total_steps: usize,
    start_time: Instant,
}

impl TrainingMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            episode_rewards: MovingAverage::new(window),
            episode_steps: MovingAverage::new(window),
            episode_options: MovingAverage::new(window),
            success_rate: MovingAverage::new(window),
            episodes: 0,
            successes: 0,
            total_steps: 0,
            start_time: Instant::now(),
        }
    }

    pub fn record_episode(&mut self, summary: &EpisodeSummary) {
        self.episode_rewards.push(summary.total_reward);
        self.episode_steps.push(summary.steps as f32);
        self.episode_options.push(summary.options as f32);
        self.success_rate.push(if summary.success { 1.0 } else { 0.0 });

        self.episodes += 1;
        self.total_steps += summary.steps;
        if summary.success {
            self.successes += 1;
        }
    }

    pub fn steps_per_second(&self) -> f64 {
        let duration = self.start_time.elapsed().as_secs_f64();
        if duration > 0.0 {
            self.total_steps as f64 / duration
        } else {
            0.0
        }
    }

    pub fn log_summary(&self, epsilon: f32) {
        tracing::info!(
            "Episode {} | reward={:.2} | success={:.1}% | steps={:.1} | options={:.1} | epsilon={:.3} | SPS {:.0}",
            self.episodes,
            self.episode_rewards.average(),
            self.success_rate.average() * 100.0,
            self.episode_steps.average(),
            self.episode_options.average(),
            epsilon,
            self.steps_per_second()
        );
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Totals over greedy evaluation episodes
#[derive(Debug, Clone, Default)]
pub struct EvaluationMetrics {
    pub num_episodes: usize,
    pub total_reward: f32,
    pub num_successes: usize,
    pub total_steps: usize,
}

impl EvaluationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(&mut self, summary: &EpisodeSummary) {
        self.num_episodes += 1;
        self.total_reward += summary.total_reward;
        self.total_steps += summary.steps;
        if summary.success {
            self.num_successes += 1;
        }
    }

    pub fn avg_reward(&self) -> f32 {
        if self.num_episodes > 0 {
            self.total_reward / self.num_episodes as f32
        } else {
            0.0
        }
    }

    pub fn success_rate(&self) -> f32 {
        if self.num_episodes > 0 {
            self.num_successes as f32 / self.num_episodes as f32
        } else {
            0.0
        }
    }

    pub fn avg_steps(&self) -> f32 {
        if self.num_episodes > 0 {
            self.total_steps as f32 / self.num_episodes as f32
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        tracing::info!("=== Evaluation Summary ===");
        tracing::info!("Episodes: {}", self.num_episodes);
        tracing::info!("Avg Reward: {:.2}", self.avg_reward());
        tracing::info!("Success Rate: {:.1}%", self.success_rate() * 100.0);
        tracing::info!("Avg Steps: {:.1}", self.avg_steps());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(reward: f32, steps: usize, success: bool) -> EpisodeSummary {
        EpisodeSummary {
            episode: 1,
            total_reward: reward,
            success,
            steps,
            options: 3,
            epsilon: 0.3,
        }
    }

    #[test]
    fn test_moving_average() {
        let mut avg = MovingAverage::new(3);
        assert!(avg.is_empty());

        avg.push(1.0);
        assert!((avg.average() - 1.0).abs() < 1e-6);

        avg.push(2.0);
        avg.push(3.0);
        assert!((avg.average() - 2.0).abs() < 1e-6);

        avg.push(4.0); // Pushes out 1.0
        assert!((avg.average() - 3.0).abs() < 1e-6);
        assert_eq!(avg.len(), 3);
    }

    #[test]
    fn test_training_metrics_track_success() {
        let mut metrics = TrainingMetrics::new(2);
        metrics.record_episode(&summary(10.0, 40, true));
        metrics.record_episode(&summary(-4.0, 60, false));
        metrics.record_episode(&summary(2.0, 20, false));

        assert_eq!(metrics.episodes, 3);
        assert_eq!(metrics.successes, 1);
        assert_eq!(metrics.total_steps, 120);
        // Window of two forgets the first success
        assert_eq!(metrics.success_rate.average(), 0.0);
        assert!((metrics.episode_rewards.average() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_evaluation_metrics() {
        let mut metrics = EvaluationMetrics::new();
        metrics.record_episode(&summary(10.0, 50, true));
        metrics.record_episode(&summary(5.0, 100, false));

        assert_eq!(metrics.num_episodes, 2);
        assert!((metrics.avg_reward() - 7.5).abs() < 1e-6);
        assert!((metrics.success_rate() - 0.5).abs() < 1e-6);
        assert!((metrics.avg_steps() - 75.0).abs() < 1e-6);
    }
}
