//! Multi-layer perceptron policy
use super::{Policy, PolicyArgs};
use crate::envs::{permute, Permutation};
use serde::{Deserialize, Serialize};
use std::iter;
use tch::{
    nn::{self, Linear, Module, VarStore},
    Device, Tensor,
};
use thiserror::Error;

/// Activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// No transformation
    Identity,
    /// Rectified linear
    Relu,
    /// Sigmoid function
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Relu
    }
}

impl Activation {
    /// The function pointer for this activation function if not the identity function.
    #[inline]
    pub fn maybe_function(&self) -> Option<fn(&Tensor) -> Tensor> {
        use Activation::*;
        match self {
            Identity => None,
            Relu => Some(Tensor::relu),
            Sigmoid => Some(Tensor::sigmoid),
            Tanh => Some(Tensor::tanh),
        }
    }
}

/// Configuration for [`MlpPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MlpConfig {
    /// Sizes of the hidden layers
    pub hidden_sizes: Vec<usize>,
    /// Activation function between hidden layers.
    pub activation: Activation,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![64],
            activation: Activation::Relu,
        }
    }
}

/// Error building a policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildPolicyError {
    #[error("{obs} observation permutations but {act} action permutations")]
    TwistCountMismatch { obs: usize, act: usize },
    #[error("observation permutation {0} is not a permutation of the observation features")]
    InvalidObsPermutation(usize),
    #[error("action permutation {0} is not a permutation of the actions")]
    InvalidActPermutation(usize),
}

/// Multi-layer perceptron policy.
///
/// Logits are averaged over the identity and every environment twist:
/// the observation is permuted, passed through the network,
/// and the output is mapped back through the paired action permutation.
pub struct MlpPolicy {
    vs: VarStore,
    layers: Vec<Linear>,
    activation: Option<fn(&Tensor) -> Tensor>,
    obs_perms: Vec<Permutation>,
    act_perms: Vec<Permutation>,
}

impl MlpPolicy {
    pub fn new(args: &PolicyArgs, config: &MlpConfig) -> Result<Self, BuildPolicyError> {
        let in_dim = args.obs_size();
        let out_dim = args.num_actions;
        check_twists(&args.obs_perms, &args.act_perms, in_dim, out_dim)?;

        let vs = VarStore::new(Device::Cpu);
        let root = vs.root();
        let in_dims = iter::once(&in_dim).chain(&config.hidden_sizes);
        let out_dims = config.hidden_sizes.iter().chain(iter::once(&out_dim));
        let layers = in_dims
            .zip(out_dims)
            .enumerate()
            .map(|(i, (in_, out_))| {
                nn::linear(
                    &root / format!("layer_{}", i),
                    *in_ as i64,
                    *out_ as i64,
                    Default::default(),
                )
            })
            .collect();

        Ok(Self {
            vs,
            layers,
            activation: config.activation.maybe_function(),
            obs_perms: args.obs_perms.clone(),
            act_perms: args.act_perms.clone(),
        })
    }

    pub fn twists(&self) -> (&[Permutation], &[Permutation]) {
        (&self.obs_perms, &self.act_perms)
    }

    fn forward(&self, input: &Tensor) -> Tensor {
        let mut iter_layers = self.layers.iter();
        let mut hidden = match iter_layers.next() {
            Some(layer) => layer.forward(input),
            None => return input.shallow_clone(),
        };
        for layer in iter_layers {
            if let Some(activation) = self.activation {
                hidden = activation(&hidden);
            }
            hidden = layer.forward(&hidden);
        }
        hidden
    }

    fn logits(&self, obs: &[f32]) -> Vec<f32> {
        Vec::<f32>::from(&self.forward(&Tensor::of_slice(obs)))
    }
}

impl Policy for MlpPolicy {
    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, obs: &[f32], masks: &[bool]) -> Vec<f32> {
        let _no_grad = tch::no_grad_guard();
        let mut total = self.logits(obs);
        let mut views = 1;
        for (obs_perm, act_perm) in self.obs_perms.iter().zip(&self.act_perms) {
            let twisted_obs = match permute(obs, obs_perm) {
                Some(twisted) => twisted,
                None => continue,
            };
            let twisted_logits = self.logits(&twisted_obs);
            for (logit, &twisted_action) in total.iter_mut().zip(act_perm) {
                *logit += twisted_logits[twisted_action];
            }
            views += 1;
        }
        for logit in total.iter_mut() {
            *logit /= views as f32;
        }
        for (logit, &legal) in total.iter_mut().zip(masks) {
            if !legal {
                *logit = f32::NEG_INFINITY;
            }
        }
        total
    }

    fn var_store(&self) -> &VarStore {
        &self.vs
    }
}

fn check_twists(
    obs_perms: &[Permutation],
    act_perms: &[Permutation],
    obs_size: usize,
    num_actions: usize,
) -> Result<(), BuildPolicyError> {
    if obs_perms.len() != act_perms.len() {
        return Err(BuildPolicyError::TwistCountMismatch {
            obs: obs_perms.len(),
            act: act_perms.len(),
        });
    }
    let identity = |n: usize| (0..n).collect::<Vec<_>>();
    for (i, perm) in obs_perms.iter().enumerate() {
        if permute(&identity(obs_size), perm).is_none() {
            return Err(BuildPolicyError::InvalidObsPermutation(i));
        }
    }
    for (i, perm) in act_perms.iter().enumerate() {
        if permute(&identity(num_actions), perm).is_none() {
            return Err(BuildPolicyError::InvalidActPermutation(i));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Kwargs;
    use rstest::{fixture, rstest};

    #[fixture]
    fn kwargs() -> Kwargs {
        Kwargs::new()
    }

    fn args(
        kwargs: &Kwargs,
        obs_perms: Vec<Permutation>,
        act_perms: Vec<Permutation>,
    ) -> PolicyArgs {
        PolicyArgs {
            obs_shape: vec![2],
            num_actions: 2,
            kwargs,
            obs_perms,
            act_perms,
        }
    }

    #[rstest]
    fn parameter_names(kwargs: Kwargs) {
        let policy = MlpPolicy::new(&args(&kwargs, vec![], vec![]), &MlpConfig::default()).unwrap();
        let mut names: Vec<_> = policy.var_store().variables().into_keys().collect();
        names.sort();
        assert_eq!(
            names,
            ["layer_0.bias", "layer_0.weight", "layer_1.bias", "layer_1.weight"]
        );
    }

    #[rstest]
    fn predict_masks_illegal(kwargs: Kwargs) {
        let policy = MlpPolicy::new(&args(&kwargs, vec![], vec![]), &MlpConfig::default()).unwrap();
        let logits = policy.predict(&[1.0, 0.0], &[true, false]);
        assert_eq!(logits.len(), 2);
        assert!(logits[0].is_finite());
        assert_eq!(logits[1], f32::NEG_INFINITY);
    }

    #[rstest]
    fn twisted_policy_is_equivariant(kwargs: Kwargs) {
        // Swapping both features and actions is a symmetry; logits must swap accordingly.
        let policy = MlpPolicy::new(
            &args(&kwargs, vec![vec![1, 0]], vec![vec![1, 0]]),
            &MlpConfig::default(),
        )
        .unwrap();
        assert_eq!(policy.twists(), (&[vec![1, 0]][..], &[vec![1, 0]][..]));
        let a = policy.predict(&[0.3, -1.2], &[true, true]);
        let b = policy.predict(&[-1.2, 0.3], &[true, true]);
        assert!((a[0] - b[1]).abs() < 1e-5);
        assert!((a[1] - b[0]).abs() < 1e-5);
    }

    #[rstest]
    #[case(vec![vec![1, 0]], vec![], BuildPolicyError::TwistCountMismatch { obs: 1, act: 0 })]
    #[case(vec![vec![0, 0]], vec![vec![1, 0]], BuildPolicyError::InvalidObsPermutation(0))]
    #[case(vec![vec![1, 0]], vec![vec![0, 1, 2]], BuildPolicyError::InvalidActPermutation(0))]
    fn invalid_twists(
        kwargs: Kwargs,
        #[case] obs_perms: Vec<Permutation>,
        #[case] act_perms: Vec<Permutation>,
        #[case] expected: BuildPolicyError,
    ) {
        let result = MlpPolicy::new(&args(&kwargs, obs_perms, act_perms), &MlpConfig::default());
        assert_eq!(result.err(), Some(expected));
    }

    #[test]
    fn config_from_kwargs() {
        let config: MlpConfig = serde_json::from_value(serde_json::json!({
            "hidden_sizes": [8, 8],
            "activation": "tanh"
        }))
        .unwrap();
        assert_eq!(config.hidden_sizes, vec![8, 8]);
        assert_eq!(config.activation, Activation::Tanh);
    }
}
