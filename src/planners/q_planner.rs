//! Tabular Q-learning over options

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::{debug, trace};

use crate::error::{ConfigError, PersistenceError};
use crate::state::GridWorld;

/// Coarse view of the world used to index the Q-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// Manhattan distance to the target: 0 (<5), 1 (<10), 2 (<20), 3 otherwise
    pub distance_bucket: u8,
    /// Direction to the target: 0 same cell, then 1..=8 clockwise from right (y grows downward)
    pub direction: u8,
    pub obstacle_adjacent: bool,
}

impl StateKey {
    pub fn from_world(world: &GridWorld) -> Self {
        let agent = world.position();
        let target = world.target();
        Self {
            distance_bucket: distance_bucket(agent.distance(&target)),
            direction: direction_code(target.x - agent.x, target.y - agent.y),
            obstacle_adjacent: world.has_obstacle_neighbor(),
        }
    }
}

fn distance_bucket(distance: i32) -> u8 {
    match distance {
        d if d < 5 => 0,
        d if d < 10 => 1,
        d if d < 20 => 2,
        _ => 3,
    }
}

fn direction_code(dx: i32, dy: i32) -> u8 {
    match (dx.signum(), dy.signum()) {
        (0, 0) => 0,
        (1, 0) => 1,
        (1, 1) => 2,
        (0, 1) => 3,
        (-1, 1) => 4,
        (-1, 0) => 5,
        (-1, -1) => 6,
        (0, -1) => 7,
        _ => 8,
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.distance_bucket,
            self.direction,
            u8::from(self.obstacle_adjacent)
        )
    }
}

impl FromStr for StateKey {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PersistenceError::StateKey(s.to_string());
        let mut parts = s.trim().split(':');
        let mut next = || -> Result<u8, PersistenceError> {
            parts
                .next()
                .and_then(|p| p.parse::<u8>().ok())
                .ok_or_else(malformed)
        };

        let distance_bucket = next()?;
        let direction = next()?;
        let obstacle_adjacent = match next()? {
            0 => false,
            1 => true,
            _ => return Err(malformed()),
        };
        if parts.next().is_some() || distance_bucket > 3 || direction > 8 {
            return Err(malformed());
        }

        Ok(Self {
            distance_bucket,
            direction,
            obstacle_adjacent,
        })
    }
}

/// Learning hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Learning rate
    pub alpha: f32,
    /// Discount factor
    pub gamma: f32,
    /// Exploration probability
    pub epsilon: f32,
    /// Multiplied into epsilon after every episode
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.95,
            epsilon: 0.3,
            epsilon_decay: 0.995,
            epsilon_min: 0.05,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |name: &'static str, value: f32, ok: bool, range: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Hyperparameter { name, value, range })
            }
        };
        check("alpha", self.alpha, self.alpha > 0.0 && self.alpha <= 1.0, "(0, 1]")?;
        check("gamma", self.gamma, (0.0..=1.0).contains(&self.gamma), "[0, 1]")?;
        check("epsilon", self.epsilon, (0.0..=1.0).contains(&self.epsilon), "[0, 1]")?;
        check(
            "epsilon_decay",
            self.epsilon_decay,
            self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0,
            "(0, 1]",
        )?;
        check(
            "epsilon_min",
            self.epsilon_min,
            (0.0..=1.0).contains(&self.epsilon_min),
            "[0, 1]",
        )
    }
}

/// One exported Q-table row
#[derive(Debug, Clone, PartialEq)]
pub struct QRow {
    pub key: StateKey,
    pub values: Vec<f32>,
}

/// Epsilon-greedy option selection with one-step Q-learning.
#[derive(Debug, Clone)]
pub struct OptionPlanner {
    config: PlannerConfig,
    num_options: usize,
    q_table: HashMap<StateKey, Vec<f32>>,
}

impl OptionPlanner {
    pub fn new(config: PlannerConfig, num_options: usize) -> Result<Self, ConfigError> {
        if num_options == 0 {
            return Err(ConfigError::EmptyCatalogue);
        }
        config.validate()?;
        Ok(Self {
            config,
            num_options,
            q_table: HashMap::new(),
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn epsilon(&self) -> f32 {
        self.config.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.config.epsilon = epsilon.clamp(0.0, 1.0);
    }

    pub fn decay_epsilon(&mut self) {
        self.config.epsilon =
            (self.config.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
    }

    pub fn num_options(&self) -> usize {
        self.num_options
    }

    /// Number of distinct state keys seen so far
    pub fn len(&self) -> usize {
        self.q_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_table.is_empty()
    }

    pub fn q_values(&self, key: &StateKey) -> Option<&[f32]> {
        self.q_table.get(key).map(Vec::as_slice)
    }

    pub fn discretize(&self, world: &GridWorld) -> StateKey {
        StateKey::from_world(world)
    }

    fn row_mut(&mut self, key: StateKey, len: usize) -> &mut Vec<f32> {
        let row = self.q_table.entry(key).or_default();
        if row.len() < len {
            row.resize(len, 0.0);
        }
        row
    }

    fn eligible_or_all(&self, eligible: &[usize]) -> Vec<usize> {
        if eligible.is_empty() {
            (0..self.num_options).collect()
        } else {
            eligible.to_vec()
        }
    }

    /// Choose among `eligible` option indices; an empty slice means every option.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        world: &GridWorld,
        eligible: &[usize],
        rng: &mut R,
    ) -> usize {
        let eligible = self.eligible_or_all(eligible);
        let key = self.discretize(world);
        let num_options = self.num_options;
        self.row_mut(key, num_options);

        if rng.random::<f32>() < self.config.epsilon {
            let choice = eligible[rng.random_range(0..eligible.len())];
            trace!(%key, choice, "Exploring");
            return choice;
        }

        self.q_table
            .get(&key)
            .map_or(eligible[0], |row| Self::argmax(row, &eligible))
    }

    /// Best eligible option for the current state, without exploration.
    pub fn select_greedy(&mut self, world: &GridWorld, eligible: &[usize]) -> usize {
        let eligible = self.eligible_or_all(eligible);
        let key = self.discretize(world);
        let num_options = self.num_options;
        let row = self.row_mut(key, num_options);
        Self::argmax(row, &eligible)
    }

    /// Highest value wins; ties go to the earliest index in `eligible`.
    fn argmax(row: &[f32], eligible: &[usize]) -> usize {
        let mut best = eligible[0];
        let mut best_value = f32::NEG_INFINITY;
        for &index in eligible {
            let value = row.get(index).copied().unwrap_or(0.0);
            if value > best_value {
                best = index;
                best_value = value;
            }
        }
        best
    }

    /// One-step Q-learning update from `prev` to `next` after running `option`.
    pub fn update(
        &mut self,
        prev: &GridWorld,
        option: usize,
        reward: f32,
        next: &GridWorld,
        num_options: usize,
    ) {
        let s = self.discretize(prev);
        let s_next = self.discretize(next);
        self.update_key(s, option, reward, s_next, num_options);
    }

    pub fn update_key(
        &mut self,
        s: StateKey,
        option: usize,
        reward: f32,
        s_next: StateKey,
        num_options: usize,
    ) {
        let len = num_options.max(option + 1);
        let max_next = self
            .row_mut(s_next, len)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        let (alpha, gamma) = (self.config.alpha, self.config.gamma);
        let row = self.row_mut(s, len);
        let q = row[option];
        row[option] = q + alpha * (reward + gamma * max_next - q);
        debug!(state = %s, option, reward, old = q, new = row[option], "Q update");
    }

    /// Every row, sorted by key.
    pub fn export_rows(&self) -> Vec<QRow> {
        let mut rows: Vec<QRow> = self
            .q_table
            .iter()
            .map(|(key, values)| QRow {
                key: *key,
                values: values.clone(),
            })
            .collect();
        rows.sort_by_key(|row| row.key);
        rows
    }

    /// Insert or overwrite rows. Short rows are zero-padded, long rows cut to
    /// the option count. Returns how many rows were cut.
    pub fn import_rows(&mut self, rows: impl IntoIterator<Item = QRow>) -> usize {
        let mut truncated = 0;
        for QRow { key, mut values } in rows {
            if values.len() > self.num_options {
                values.truncate(self.num_options);
                truncated += 1;
            }
            values.resize(self.num_options, 0.0);
            self.q_table.insert(key, values);
        }
        truncated
    }
}
