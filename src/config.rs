//! Training configuration record and environment loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::planners::{ExecutorConfig, PlannerConfig};
use crate::state::{RewardConfig, validate_grid_size};

/// Everything a training run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub width: i32,
    pub height: i32,
    /// Fraction of free cells turned into obstacles on reset
    pub obstacle_density: f32,
    pub episodes: usize,
    /// Option activations per episode
    pub max_options: usize,
    /// Primitive steps per option activation
    pub max_primitive_steps: usize,
    /// Consecutive activations without progress before an episode is abandoned
    pub stuck_episode_limit: usize,
    pub planner: PlannerConfig,
    pub reward: RewardConfig,
    pub executor: ExecutorConfig,
    /// Fixed RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Keep the agent in the top-left corner instead of placing it randomly
    pub fixed_start: bool,
    pub q_table_path: Option<PathBuf>,
    /// Load `q_table_path` before training
    pub load_q_table: bool,
    pub training_log_path: Option<PathBuf>,
    /// Episodes between progress summaries
    pub log_interval: usize,
    /// Run one greedy episode after training
    pub demo: bool,
    pub visualizer: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            obstacle_density: 0.15,
            episodes: 500,
            max_options: 30,
            max_primitive_steps: 20,
            stuck_episode_limit: 5,
            planner: PlannerConfig::default(),
            reward: RewardConfig::default(),
            executor: ExecutorConfig::default(),
            seed: None,
            fixed_start: false,
            q_table_path: None,
            load_q_table: false,
            training_log_path: None,
            log_interval: 50,
            demo: true,
            visualizer: false,
        }
    }
}

impl TrainingConfig {
    /// Defaults overridden by `COURIER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(width) = env_var("COURIER_WIDTH")? {
            config.width = width;
        }
        if let Some(height) = env_var("COURIER_HEIGHT")? {
            config.height = height;
        }
        if let Some(density) = env_var("COURIER_OBSTACLE_DENSITY")? {
            config.obstacle_density = density;
        }
        if let Some(episodes) = env_var("COURIER_EPISODES")? {
            config.episodes = episodes;
        }
        if let Some(max_options) = env_var("COURIER_MAX_OPTIONS")? {
            config.max_options = max_options;
        }
        if let Some(steps) = env_var("COURIER_MAX_PRIMITIVE_STEPS")? {
            config.max_primitive_steps = steps;
        }
        if let Some(alpha) = env_var("COURIER_ALPHA")? {
            config.planner.alpha = alpha;
        }
        if let Some(gamma) = env_var("COURIER_GAMMA")? {
            config.planner.gamma = gamma;
        }
        if let Some(epsilon) = env_var("COURIER_EPSILON")? {
            config.planner.epsilon = epsilon;
        }
        if let Some(decay) = env_var("COURIER_EPSILON_DECAY")? {
            config.planner.epsilon_decay = decay;
        }
        if let Some(epsilon_min) = env_var("COURIER_EPSILON_MIN")? {
            config.planner.epsilon_min = epsilon_min;
        }
        config.seed = env_var("COURIER_SEED")?;
        config.q_table_path = env::var("COURIER_QTABLE").ok().map(PathBuf::from);
        config.training_log_path = env::var("COURIER_TRAINING_LOG").ok().map(PathBuf::from);
        if let Some(load) = env_flag("COURIER_LOAD_QTABLE")? {
            config.load_q_table = load;
        }
        if let Some(interval) = env_var("COURIER_LOG_INTERVAL")? {
            config.log_interval = interval;
        }
        if let Some(fixed) = env_flag("COURIER_FIXED_START")? {
            config.fixed_start = fixed;
        }
        if let Some(demo) = env_flag("COURIER_DEMO")? {
            config.demo = demo;
        }
        if let Some(visualizer) = env_flag("COURIER_VISUALIZER")? {
            config.visualizer = visualizer;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_grid_size(self.width, self.height)?;
        if !(0.0..1.0).contains(&self.obstacle_density) {
            return Err(ConfigError::ObstacleDensity(self.obstacle_density));
        }
        for (name, value) in [
            ("episodes", self.episodes),
            ("max_options", self.max_options),
            ("max_primitive_steps", self.max_primitive_steps),
            ("stuck_episode_limit", self.stuck_episode_limit),
            ("log_interval", self.log_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroBudget(name));
            }
        }
        self.planner.validate()?;
        self.executor.validate()
    }
}

/// `Ok(None)` when unset, an error when set but unparsable.
fn env_var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_value(key, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_flag(key, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.planner.alpha, 0.1);
        assert_eq!(config.planner.gamma, 0.95);
        assert_eq!(config.max_primitive_steps, 20);
    }

    #[test]
    fn test_validation_failures() {
        let config = TrainingConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDimension { .. })
        ));

        let config = TrainingConfig {
            height: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::GridTooSmall { .. })));

        // Large enough that width * height overflows i32
        let config = TrainingConfig {
            width: 100_000,
            height: 100_000,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::GridTooLarge {
                width: 100_000,
                height: 100_000,
                max: 1024,
            })
        );

        let config = TrainingConfig {
            max_options: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBudget("max_options")));

        let config = TrainingConfig {
            obstacle_density: 1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ObstacleDensity(1.0)));
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!(parse_value::<i32>("COURIER_WIDTH", " 12 "), Ok(12));
        assert_eq!(
            parse_value::<usize>("COURIER_EPISODES", "many"),
            Err(ConfigError::InvalidValue {
                key: "COURIER_EPISODES".to_string(),
                value: "many".to_string(),
            })
        );
        assert_eq!(parse_flag("COURIER_DEMO", "TRUE"), Ok(true));
        assert_eq!(parse_flag("COURIER_DEMO", "0"), Ok(false));
        assert!(parse_flag("COURIER_DEMO", "maybe").is_err());
    }
}
