//! Grid world environment
use super::{Environment, Permutation, Twists};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

const EMPTY: i64 = 0;
const AGENT: i64 = 1;
const GOAL: i64 = 2;
const WALL: i64 = 3;

const UP: usize = 0;
const DOWN: usize = 1;
const LEFT: usize = 2;
const RIGHT: usize = 3;
const NUM_ACTIONS: usize = 4;

/// Configuration for [`GridWorld`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridWorldConfig {
    pub width: usize,
    pub height: usize,
    /// Blocked `(row, col)` cells.
    #[serde(default)]
    pub walls: Vec<(usize, usize)>,
    /// Episode step limit.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

const fn default_max_steps() -> usize {
    100
}

impl Default for GridWorldConfig {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
            walls: Vec::new(),
            max_steps: default_max_steps(),
        }
    }
}

impl GridWorldConfig {
    pub fn build_env(&self) -> Result<GridWorld, BuildEnvError> {
        GridWorld::new(self.clone())
    }
}

/// Error building an environment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildEnvError {
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("wall ({0}, {1}) is outside the grid")]
    WallOutOfBounds(usize, usize),
    #[error("wall ({0}, {1}) blocks the start or the goal")]
    BlockedEndpoint(usize, usize),
}

/// Grid World
///
/// The agent starts in the top-left cell and must reach the goal in the
/// bottom-right cell. Reaching the goal gives 1 reward and ends the episode.
/// Actions move up, down, left or right; moves into walls or off the grid are masked.
#[derive(Debug, Clone, PartialEq)]
pub struct GridWorld {
    config: GridWorldConfig,
    walls: HashSet<(usize, usize)>,
    position: (usize, usize),
    steps: usize,
    reward: f32,
}

impl GridWorld {
    pub fn new(config: GridWorldConfig) -> Result<Self, BuildEnvError> {
        if config.width == 0 || config.height == 0 {
            return Err(BuildEnvError::EmptyGrid);
        }
        let goal = (config.height - 1, config.width - 1);
        for &(row, col) in &config.walls {
            if row >= config.height || col >= config.width {
                return Err(BuildEnvError::WallOutOfBounds(row, col));
            }
            if (row, col) == (0, 0) || (row, col) == goal {
                return Err(BuildEnvError::BlockedEndpoint(row, col));
            }
        }
        let walls = config.walls.iter().copied().collect();
        Ok(Self {
            config,
            walls,
            position: (0, 0),
            steps: 0,
            reward: 0.0,
        })
    }

    pub const fn position(&self) -> (usize, usize) {
        self.position
    }

    const fn goal(&self) -> (usize, usize) {
        (self.config.height - 1, self.config.width - 1)
    }

    const fn index(&self, cell: (usize, usize)) -> usize {
        cell.0 * self.config.width + cell.1
    }

    /// The cell reached by taking `action`, if it is on the grid and not a wall.
    fn target(&self, action: usize) -> Option<(usize, usize)> {
        let (row, col) = self.position;
        let target = match action {
            UP => (row.checked_sub(1)?, col),
            DOWN => (row + 1, col),
            LEFT => (row, col.checked_sub(1)?),
            RIGHT => (row, col + 1),
            _ => return None,
        };
        if target.0 >= self.config.height
            || target.1 >= self.config.width
            || self.walls.contains(&target)
        {
            return None;
        }
        Some(target)
    }

    /// Transposition symmetry, if the grid is square and the walls are symmetric.
    fn transpose_twist(&self) -> Option<(Permutation, Permutation)> {
        let size = self.config.width;
        if size != self.config.height
            || !self
                .walls
                .iter()
                .all(|&(row, col)| self.walls.contains(&(col, row)))
        {
            return None;
        }
        let obs_perm = (0..size * size)
            .map(|i| (i % size) * size + i / size)
            .collect();
        let mut act_perm = vec![0; NUM_ACTIONS];
        act_perm[UP] = LEFT;
        act_perm[DOWN] = RIGHT;
        act_perm[LEFT] = UP;
        act_perm[RIGHT] = DOWN;
        Some((obs_perm, act_perm))
    }
}

impl Environment for GridWorld {
    fn reset(&mut self) {
        self.position = (0, 0);
        self.steps = 0;
        self.reward = 0.0;
    }

    fn step(&mut self, action: usize) {
        if let Some(target) = self.target(action) {
            self.position = target;
        }
        self.steps += 1;
        self.reward = if self.position == self.goal() { 1.0 } else { 0.0 };
    }

    fn is_final(&self) -> bool {
        self.position == self.goal() || self.steps >= self.config.max_steps
    }

    fn reward(&self) -> f32 {
        self.reward
    }

    fn masks(&self) -> Vec<bool> {
        (0..NUM_ACTIONS).map(|a| self.target(a).is_some()).collect()
    }

    fn state(&self) -> Vec<i64> {
        let mut cells = vec![EMPTY; self.config.width * self.config.height];
        for &wall in &self.walls {
            cells[self.index(wall)] = WALL;
        }
        cells[self.index(self.goal())] = GOAL;
        cells[self.index(self.position)] = AGENT;
        cells
    }

    #[allow(clippy::cast_precision_loss)]
    fn observe(&self) -> Vec<f32> {
        self.state().into_iter().map(|c| c as f32).collect()
    }

    fn obs_shape(&self) -> Vec<usize> {
        vec![self.config.width * self.config.height]
    }

    fn num_actions(&self) -> usize {
        NUM_ACTIONS
    }

    fn twists(&self) -> Twists {
        self.transpose_twist()
            .map(|(obs, act)| (vec![obs], vec![act]))
            .unwrap_or_default()
    }
}
