//! Policies
mod mlp;

pub use mlp::{Activation, BuildPolicyError, MlpConfig, MlpPolicy};

use crate::config::Kwargs;
use crate::envs::Permutation;
use tch::nn::VarStore;

/// A parameterized policy over discrete actions.
pub trait Policy {
    /// Action logits for an observation.
    ///
    /// Actions whose mask is `false` get a logit of `-inf`.
    fn predict(&self, obs: &[f32], masks: &[bool]) -> Vec<f32>;

    /// The policy parameters.
    ///
    /// Restoring a checkpoint overwrites these variables in place.
    fn var_store(&self) -> &VarStore;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn predict(&self, obs: &[f32], masks: &[bool]) -> Vec<f32> {
        P::predict(self, obs, masks)
    }
    fn var_store(&self) -> &VarStore {
        P::var_store(self)
    }
}

/// Policy constructor arguments.
///
/// `obs_shape`, `num_actions` and the permutations come from the constructed
/// environment; `kwargs` comes from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyArgs<'a> {
    pub obs_shape: Vec<usize>,
    pub num_actions: usize,
    pub kwargs: &'a Kwargs,
    pub obs_perms: Vec<Permutation>,
    pub act_perms: Vec<Permutation>,
}

impl<'a> PolicyArgs<'a> {
    /// Number of observation features.
    pub fn obs_size(&self) -> usize {
        self.obs_shape.iter().product()
    }
}
