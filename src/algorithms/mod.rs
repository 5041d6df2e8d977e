//! Algorithms: the assembled unit that owns an environment and a policy
mod rollout;

pub use rollout::{CollectingConfig, Rollout, RolloutConfig};

use crate::envs::Environment;
use crate::policies::Policy;
use std::collections::BTreeMap;
use std::path::Path;

/// A learning or data-collection algorithm.
///
/// Owns the environment and policy it was constructed with.
pub trait Algorithm {
    fn env(&self) -> &dyn Environment;

    fn env_mut(&mut self) -> &mut dyn Environment;

    fn policy(&self) -> &dyn Policy;

    /// Directory for the algorithm's own artifacts, if any.
    fn run_path(&self) -> Option<&Path>;

    /// Run the policy in the environment and collect trajectories.
    fn collect(&mut self) -> (Collected, CollectStats);
}

/// Collected trajectory steps, flattened across episodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub obs: Vec<Vec<f32>>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    /// Per-step auxiliary values keyed by name, e.g. `"rets"`.
    pub additional_data: BTreeMap<String, Vec<f32>>,
}

impl Collected {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Summary statistics of a collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollectStats {
    pub episodes: usize,
    pub steps: usize,
    /// Mean undiscounted episode return.
    pub mean_return: f64,
}
