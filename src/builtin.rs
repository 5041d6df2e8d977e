//! Components provided by this crate
//!
//! | Identifier                   | Component                                  |
//! |------------------------------|--------------------------------------------|
//! | `plugrl.envs.GridWorld`      | [`GridWorld`](crate::envs::GridWorld)      |
//! | `plugrl.policies.MlpPolicy`  | [`MlpPolicy`](crate::policies::MlpPolicy)  |
//! | `plugrl.algorithms.Rollout`  | [`Rollout`](crate::algorithms::Rollout)    |
use crate::algorithms::{Rollout, RolloutConfig};
use crate::envs::GridWorldConfig;
use crate::policies::{MlpConfig, MlpPolicy};
use crate::registry::{parse_kwargs, ConstructionError, Registry};

pub const ENVS_MODULE: &str = "plugrl.envs";
pub const POLICIES_MODULE: &str = "plugrl.policies";
pub const ALGORITHMS_MODULE: &str = "plugrl.algorithms";

/// Register the builtin component modules.
pub fn register(registry: &mut Registry) {
    registry
        .register_module(ENVS_MODULE, |module| {
            module.add_env("GridWorld", |kwargs| {
                let config: GridWorldConfig = parse_kwargs(kwargs)?;
                let env = config.build_env().map_err(ConstructionError::new)?;
                Ok(Box::new(env))
            });
        })
        .register_module(POLICIES_MODULE, |module| {
            module.add_policy("MlpPolicy", |args| {
                let config: MlpConfig = parse_kwargs(args.kwargs)?;
                let policy = MlpPolicy::new(&args, &config).map_err(ConstructionError::new)?;
                Ok(Box::new(policy))
            });
        })
        .register_module(ALGORITHMS_MODULE, |module| {
            module.add_algorithm("Rollout", |env, policy, kwargs, run_path| {
                let config: RolloutConfig = parse_kwargs(kwargs)?;
                Ok(Box::new(Rollout::new(env, policy, config, run_path)))
            });
        });
}
