use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::infra::{Action, Bounds, Position};

use super::grid::{Cell, Grid, MAX_GRID_SIDE};
use super::reward::{RewardConfig, compute_reward};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentState {
    pub position: Position,
    pub carrying: bool,
    /// Cell the object was picked up from
    pub object_origin: Option<Position>,
}

impl AgentState {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            carrying: false,
            object_origin: None,
        }
    }
}

/// Where `reset` puts the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPlacement {
    Fixed(Position),
    Random,
}

/// The simulation: grid contents, agent, target and object.
#[derive(Clone, Debug)]
pub struct GridWorld {
    grid: Grid,
    agent: AgentState,
    target: Position,
    object: Option<Position>,
    start: StartPlacement,
    reward_config: RewardConfig,
    steps: usize,
    /// Cells walked since the last target visit (or the episode start), up to
    /// the pickup cell. Frozen while carrying.
    approach: Vec<Position>,
}

impl GridWorld {
    /// Empty world with the agent in the top-left corner, the target in the
    /// bottom-right corner and the object in the centre.
    pub fn new(width: i32, height: i32, reward_config: RewardConfig) -> Result<Self, ConfigError> {
        validate_grid_size(width, height)?;
        let mut world = Self::from_layout(
            width,
            height,
            Position::new(0, 0),
            Position::new(width - 1, height - 1),
            Some(Position::new(width / 2, height / 2)),
            &[],
        )?;
        world.reward_config = reward_config;
        Ok(world)
    }

    /// World with explicit placements. Obstacles on the agent, target or object are ignored.
    pub fn from_layout(
        width: i32,
        height: i32,
        agent: Position,
        target: Position,
        object: Option<Position>,
        obstacles: &[Position],
    ) -> Result<Self, ConfigError> {
        validate_grid_size(width, height)?;
        let bounds = Bounds::from_size(width, height);
        let check = |name: &'static str, position: Position| {
            if bounds.contains(&position) {
                Ok(())
            } else {
                Err(ConfigError::OutOfBounds {
                    name,
                    position,
                    width,
                    height,
                })
            }
        };
        check("agent", agent)?;
        check("target", target)?;
        if agent == target {
            return Err(ConfigError::Overlap {
                first: "agent",
                second: "target",
                position: agent,
            });
        }
        if let Some(object) = object {
            check("object", object)?;
            if object == agent || object == target {
                return Err(ConfigError::Overlap {
                    first: "object",
                    second: if object == agent { "agent" } else { "target" },
                    position: object,
                });
            }
        }

        let mut grid = Grid::new(width, height);
        for &pos in obstacles {
            if pos != agent && pos != target && Some(pos) != object {
                grid.set(pos, Cell::Obstacle);
            }
        }
        grid.set(target, Cell::Target);
        if let Some(object) = object {
            grid.set(object, Cell::Object);
        }
        grid.set(agent, Cell::Robot);

        Ok(Self {
            grid,
            agent: AgentState::new(agent),
            target,
            object,
            start: StartPlacement::Fixed(agent),
            reward_config: RewardConfig::default(),
            steps: 0,
            approach: vec![agent],
        })
    }

    pub fn with_reward_config(mut self, reward_config: RewardConfig) -> Self {
        self.reward_config = reward_config;
        self
    }

    pub fn set_start(&mut self, start: StartPlacement) {
        self.start = start;
    }

    /// Rebuilds the episode layout. All randomness comes from `rng`, so a seeded
    /// generator reproduces placements exactly.
    #[tracing::instrument(level = "debug", skip(self, rng))]
    pub fn reset<R: Rng + ?Sized>(&mut self, obstacle_density: f32, rng: &mut R) {
        self.grid.clear();
        self.steps = 0;

        let mut free: Vec<Position> = self.grid.iter().map(|(pos, _)| pos).collect();

        let agent = match self.start {
            StartPlacement::Fixed(pos) if self.grid.in_bounds(&pos) => pos,
            _ => free[rng.random_range(0..free.len())],
        };
        free.retain(|&p| p != agent);

        let target = free.swap_remove(rng.random_range(0..free.len()));
        let object = free.swap_remove(rng.random_range(0..free.len()));

        let density = obstacle_density.clamp(0.0, 1.0);
        let obstacle_count = (density * free.len() as f32).round() as usize;
        free.shuffle(rng);
        for &pos in free.iter().take(obstacle_count) {
            self.grid.set(pos, Cell::Obstacle);
        }

        self.grid.set(target, Cell::Target);
        self.grid.set(object, Cell::Object);
        self.grid.set(agent, Cell::Robot);

        self.agent = AgentState::new(agent);
        self.target = target;
        self.object = Some(object);
        self.approach.clear();
        self.approach.push(agent);

        debug!(
            %agent,
            %target,
            %object,
            obstacles = obstacle_count,
            "World reset"
        );
    }

    /// Applies one primitive action and returns its reward.
    pub fn step(&mut self, action: Action) -> f32 {
        self.steps += 1;

        let prev = self.agent.position;
        let candidate = self.grid.bounds().clamp(prev.offset(action));
        let next = if self.grid.is_obstacle(&candidate) {
            prev
        } else {
            candidate
        };

        let on_obstacle = next != prev && self.grid.is_obstacle(&next);

        if next != prev {
            let vacated = if prev == self.target {
                Cell::Target
            } else {
                Cell::Empty
            };
            self.grid.set(prev, vacated);
            self.grid.set(next, Cell::Robot);
            self.agent.position = next;
            if !self.agent.carrying {
                self.extend_approach(next);
            }
        }

        if !self.agent.carrying && self.object == Some(next) {
            debug!(cell = %next, "Picked up object");
            self.agent.carrying = true;
            self.agent.object_origin = Some(next);
            self.object = None;
        }

        let reward = compute_reward(
            &self.reward_config,
            prev,
            next,
            self.agent.carrying,
            self.target,
            on_obstacle,
        );
        trace!(action = action.as_str(), from = %prev, to = %next, reward, "Step");
        reward
    }

    /// Loops are cut out: re-entering a cell drops everything walked after it.
    fn extend_approach(&mut self, cell: Position) {
        if cell == self.target {
            self.approach.clear();
        } else if let Some(i) = self.approach.iter().position(|&p| p == cell) {
            self.approach.truncate(i);
        }
        self.approach.push(cell);
    }

    pub fn has_obstacle_neighbor(&self) -> bool {
        self.agent
            .position
            .neighbors()
            .iter()
            .any(|n| self.grid.is_obstacle(n))
    }

    /// Adjacent obstacle cells in N, E, S, W order.
    pub fn adjacent_obstacles(&self) -> Vec<Position> {
        self.agent
            .position
            .neighbors()
            .into_iter()
            .filter(|n| self.grid.is_obstacle(n))
            .collect()
    }

    /// Removes the first adjacent obstacle in N, E, S, W order.
    pub fn clear_adjacent_obstacle(&mut self) -> bool {
        match self.adjacent_obstacles().first() {
            Some(&pos) => self.clear_obstacle_at(pos),
            None => false,
        }
    }

    /// Removes the obstacle at `pos` if it is adjacent to the agent.
    pub fn clear_obstacle_at(&mut self, pos: Position) -> bool {
        if !self.agent.position.is_adjacent(&pos) || !self.grid.is_obstacle(&pos) {
            return false;
        }
        self.grid.set(pos, Cell::Empty);
        debug!(cell = %pos, "Cleared obstacle");
        true
    }

    pub fn is_obstacle(&self, pos: &Position) -> bool {
        self.grid.is_obstacle(pos)
    }

    pub fn is_task_complete(&self) -> bool {
        self.agent.carrying && self.agent.position == self.target
    }

    /// Where the agent should be heading: the object until it is picked up, then the target.
    pub fn current_destination(&self) -> Position {
        match self.object {
            Some(object) if !self.agent.carrying => object,
            _ => self.target,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agent(&self) -> &AgentState {
        &self.agent
    }

    pub fn position(&self) -> Position {
        self.agent.position
    }

    pub fn is_carrying(&self) -> bool {
        self.agent.carrying
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn object(&self) -> Option<Position> {
        self.object
    }

    pub fn object_origin(&self) -> Option<Position> {
        self.agent.object_origin
    }

    /// Route the agent took to the object, oldest cell first.
    pub fn approach_route(&self) -> &[Position] {
        &self.approach
    }

    pub fn reward_config(&self) -> &RewardConfig {
        &self.reward_config
    }

    pub fn width(&self) -> i32 {
        self.grid.width
    }

    pub fn height(&self) -> i32 {
        self.grid.height
    }

    pub fn bounds(&self) -> Bounds {
        self.grid.bounds()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn obstacle_count(&self) -> usize {
        self.grid.count(Cell::Obstacle)
    }
}

/// Grids need room for agent, target and object, and sides of at most [`MAX_GRID_SIDE`].
pub fn validate_grid_size(width: i32, height: i32) -> Result<(), ConfigError> {
    if width <= 0 || height <= 0 {
        return Err(ConfigError::ZeroDimension { width, height });
    }
    if width < 3 || height < 3 {
        return Err(ConfigError::GridTooSmall { width, height });
    }
    if width > MAX_GRID_SIDE || height > MAX_GRID_SIDE {
        return Err(ConfigError::GridTooLarge {
            width,
            height,
            max: MAX_GRID_SIDE,
        });
    }
    Ok(())
}

impl fmt::Display for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.grid.height {
            let row: Vec<String> = (0..self.grid.width)
                .map(|x| {
                    let cell = self.grid.get(&Position::new(x, y)).unwrap_or(Cell::Empty);
                    cell.symbol().to_string()
                })
                .collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        write!(f, "steps: {}", self.steps)?;
        if self.agent.carrying {
            write!(f, " (carrying)")?;
        }
        Ok(())
    }
}
