//! Rollout collection
use super::{Algorithm, CollectStats, Collected};
use crate::envs::Environment;
use crate::policies::Policy;
use log::{debug, warn};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for [`Rollout`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RolloutConfig {
    pub collecting: CollectingConfig,
}

/// Episode collection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CollectingConfig {
    pub num_episodes: usize,
    /// Accepted for compatibility; collection runs on the calling thread.
    pub num_cores: usize,
    /// Safety cap on episode length in addition to the environment's own limit.
    pub max_steps: usize,
    /// Discount factor for the returns in `additional_data["rets"]`.
    pub gamma: f32,
    pub seed: u64,
}

impl Default for CollectingConfig {
    fn default() -> Self {
        Self {
            num_episodes: 1,
            num_cores: 1,
            max_steps: 1000,
            gamma: 0.99,
            seed: 0,
        }
    }
}

/// Collects episodes by sampling actions from the policy.
pub struct Rollout {
    env: Box<dyn Environment>,
    policy: Box<dyn Policy>,
    config: RolloutConfig,
    run_path: Option<PathBuf>,
    rng: StdRng,
}

impl Rollout {
    pub fn new(
        env: Box<dyn Environment>,
        policy: Box<dyn Policy>,
        config: RolloutConfig,
        run_path: Option<&Path>,
    ) -> Self {
        if config.collecting.num_cores > 1 {
            warn!(
                "num_cores = {} ignored; collecting on a single thread",
                config.collecting.num_cores
            );
        }
        let rng = StdRng::seed_from_u64(config.collecting.seed);
        Self {
            env,
            policy,
            config,
            run_path: run_path.map(Path::to_path_buf),
            rng,
        }
    }

    pub const fn config(&self) -> &RolloutConfig {
        &self.config
    }

    /// Sample an action from the softmax of the policy logits.
    ///
    /// Returns `None` if no action is legal.
    fn sample_action(&mut self, obs: &[f32], masks: &[bool]) -> Option<usize> {
        let logits = self.policy.predict(obs, masks);
        let max = logits
            .iter()
            .copied()
            .filter(|l| l.is_finite())
            .fold(f32::NEG_INFINITY, f32::max);
        if !max.is_finite() {
            return None;
        }
        let weights = logits.iter().map(|&l| (l - max).exp());
        let dist = WeightedIndex::new(weights).ok()?;
        Some(self.rng.sample(dist))
    }

    /// Run one episode, appending to `collected`. Returns the undiscounted return.
    fn run_episode(&mut self, collected: &mut Collected) -> f32 {
        self.env.reset();
        let mut rewards = Vec::new();
        while !self.env.is_final() && rewards.len() < self.config.collecting.max_steps {
            let obs = self.env.observe();
            let masks = self.env.masks();
            let action = match self.sample_action(&obs, &masks) {
                Some(action) => action,
                None => break,
            };
            self.env.step(action);
            let reward = self.env.reward();
            collected.obs.push(obs);
            collected.actions.push(action);
            collected.rewards.push(reward);
            rewards.push(reward);
        }

        let gamma = self.config.collecting.gamma;
        let mut rets: Vec<f32> = rewards
            .iter()
            .rev()
            .scan(0.0, |ret, &r| {
                *ret = r + gamma * *ret;
                Some(*ret)
            })
            .collect();
        rets.reverse();
        collected
            .additional_data
            .entry("rets".into())
            .or_default()
            .extend(rets);
        rewards.iter().sum()
    }
}

impl Algorithm for Rollout {
    fn env(&self) -> &dyn Environment {
        &*self.env
    }

    fn env_mut(&mut self) -> &mut dyn Environment {
        &mut *self.env
    }

    fn policy(&self) -> &dyn Policy {
        &*self.policy
    }

    fn run_path(&self) -> Option<&Path> {
        self.run_path.as_deref()
    }

    fn collect(&mut self) -> (Collected, CollectStats) {
        let mut collected = Collected::default();
        collected.additional_data.insert("rets".into(), Vec::new());
        let num_episodes = self.config.collecting.num_episodes;
        let mut total_return = 0.0;
        for _ in 0..num_episodes {
            total_return += f64::from(self.run_episode(&mut collected));
        }
        let stats = CollectStats {
            episodes: num_episodes,
            steps: collected.len(),
            mean_return: if num_episodes == 0 {
                0.0
            } else {
                total_return / num_episodes as f64
            },
        };
        debug!("collected {:?}", stats);
        (collected, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Kwargs;
    use crate::envs::{GridWorld, GridWorldConfig};
    use crate::policies::{MlpConfig, MlpPolicy, PolicyArgs};
    use crate::testing::StubEnv;
    use rstest::{fixture, rstest};

    fn policy_for(env: &dyn Environment) -> Box<dyn Policy> {
        let kwargs = Kwargs::new();
        let (obs_perms, act_perms) = env.twists();
        let args = PolicyArgs {
            obs_shape: env.obs_shape(),
            num_actions: env.num_actions(),
            kwargs: &kwargs,
            obs_perms,
            act_perms,
        };
        Box::new(MlpPolicy::new(&args, &MlpConfig::default()).unwrap())
    }

    #[fixture]
    fn grid_rollout() -> Rollout {
        let env = GridWorld::new(GridWorldConfig {
            width: 3,
            height: 3,
            max_steps: 20,
            ..GridWorldConfig::default()
        })
        .unwrap();
        let policy = policy_for(&env);
        let config = RolloutConfig {
            collecting: CollectingConfig {
                num_episodes: 3,
                ..CollectingConfig::default()
            },
        };
        Rollout::new(Box::new(env), policy, config, None)
    }

    #[rstest]
    fn collect_grid_world(mut grid_rollout: Rollout) {
        assert_eq!(grid_rollout.config().collecting.num_episodes, 3);
        let (collected, stats) = grid_rollout.collect();
        assert_eq!(stats.episodes, 3);
        assert_eq!(stats.steps, collected.len());
        assert!(!collected.is_empty());
        assert!(collected.len() <= 60);
        assert_eq!(collected.obs.len(), collected.len());
        assert_eq!(collected.rewards.len(), collected.len());
        assert_eq!(collected.additional_data["rets"].len(), collected.len());
        assert!(collected.obs.iter().all(|o| o.len() == 9));
    }

    #[rstest]
    fn sampled_actions_are_legal(mut grid_rollout: Rollout) {
        // Replay the actions on a fresh copy of the environment and check each against the masks.
        let (collected, _) = grid_rollout.collect();
        let mut env = GridWorld::new(GridWorldConfig {
            width: 3,
            height: 3,
            max_steps: 20,
            ..GridWorldConfig::default()
        })
        .unwrap();
        env.reset();
        for &action in &collected.actions {
            if env.is_final() {
                env.reset();
            }
            assert!(env.masks()[action]);
            env.step(action);
        }
    }

    #[test]
    fn discounted_returns() {
        // StubEnv gives reward 1 on every step and ends after `episode_length` steps.
        let env = StubEnv {
            episode_length: 3,
            ..StubEnv::default()
        };
        let policy = policy_for(&env);
        let config = RolloutConfig {
            collecting: CollectingConfig {
                gamma: 0.5,
                ..CollectingConfig::default()
            },
        };
        let mut rollout = Rollout::new(Box::new(env), policy, config, None);
        let (collected, stats) = rollout.collect();
        assert_eq!(collected.rewards, vec![1.0, 1.0, 1.0]);
        assert_eq!(collected.additional_data["rets"], vec![1.75, 1.5, 1.0]);
        assert!((stats.mean_return - 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_episodes() {
        let env = StubEnv::default();
        let policy = policy_for(&env);
        let config = RolloutConfig {
            collecting: CollectingConfig {
                num_episodes: 0,
                ..CollectingConfig::default()
            },
        };
        let mut rollout = Rollout::new(Box::new(env), policy, config, Some(Path::new("runs/a")));
        let (collected, stats) = rollout.collect();
        assert!(collected.is_empty());
        assert_eq!(stats.mean_return, 0.0);
        assert_eq!(rollout.run_path(), Some(Path::new("runs/a")));
    }

    #[test]
    fn config_rejects_unknown_keys() {
        let result: Result<RolloutConfig, _> = serde_json::from_value(
            serde_json::json!({"collecting": {"num_episodes": 2, "bogus": 1}}),
        );
        assert!(result.is_err());
    }
}
