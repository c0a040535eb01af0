mod grid;
mod reward;
mod world;

pub use grid::{Cell, Grid, MAX_GRID_SIDE};
pub use reward::{RewardConfig, compute_reward};
pub use world::{AgentState, GridWorld, StartPlacement, validate_grid_size};
