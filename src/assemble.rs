//! Assembly of an algorithm from a configuration
//!
//! The components are built in a fixed order:
//! 1. the environment, from `env_cls` and `env`;
//! 2. the environment twists, which may depend on the environment arguments;
//! 3. the policy, from `policy_cls`, `policy`, the environment structure and the twists;
//! 4. optionally, the policy parameters from a checkpoint;
//! 5. the algorithm, from `algorithm_cls` and `algorithm`, taking ownership of
//!    the environment and the policy.
use crate::algorithms::Algorithm;
use crate::checkpoint;
use crate::config::{Config, ALGORITHM, ALGORITHM_CLS, ENV, ENV_CLS, POLICY, POLICY_CLS};
use crate::error::AssembleError;
use crate::policies::PolicyArgs;
use crate::registry::{ConstructionError, Registry};
use log::{debug, info};
use std::path::Path;

/// Policy arguments supplied by the assembler rather than the configuration.
const INJECTED_POLICY_ARGS: [&str; 2] = ["obs_perms", "act_perms"];

/// Builds algorithms from configurations using a component registry.
#[derive(Debug)]
pub struct Assembler {
    registry: Registry,
}

impl Assembler {
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Construct the algorithm described by `config`.
    ///
    /// # Args
    /// * `config` - Configuration with the `env_cls`, `env`, `policy_cls`, `policy`,
    ///     `algorithm_cls` and `algorithm` keys.
    /// * `run_path` - Passed through to the algorithm constructor.
    /// * `checkpoint_path` - Policy parameters to restore before building the algorithm.
    pub fn assemble(
        &mut self,
        config: &Config,
        run_path: Option<&Path>,
        checkpoint_path: Option<&Path>,
    ) -> Result<Box<dyn Algorithm>, AssembleError> {
        let env_id = config.identifier(ENV_CLS)?;
        let make_env = self.registry.resolve_env(env_id)?;
        let env = make_env(config.kwargs(ENV)?).map_err(|source| construction(env_id, source))?;
        debug!("constructed environment {}", env_id);

        let (obs_perms, act_perms) = env.twists();
        debug!(
            "environment has {} observation and {} action twists",
            obs_perms.len(),
            act_perms.len()
        );

        let policy_id = config.identifier(POLICY_CLS)?;
        let make_policy = self.registry.resolve_policy(policy_id)?;
        let policy_kwargs = config.kwargs(POLICY)?;
        if let Some(name) = INJECTED_POLICY_ARGS
            .iter()
            .find(|name| policy_kwargs.contains_key(**name))
        {
            return Err(construction(
                policy_id,
                ConstructionError::duplicate_argument(name),
            ));
        }
        let policy = make_policy(PolicyArgs {
            obs_shape: env.obs_shape(),
            num_actions: env.num_actions(),
            kwargs: policy_kwargs,
            obs_perms,
            act_perms,
        })
        .map_err(|source| construction(policy_id, source))?;
        debug!("constructed policy {}", policy_id);

        if let Some(path) = checkpoint_path {
            info!("restoring policy parameters from {}", path.display());
            checkpoint::restore(policy.var_store(), path)?;
        }

        let algorithm_id = config.identifier(ALGORITHM_CLS)?;
        let make_algorithm = self.registry.resolve_algorithm(algorithm_id)?;
        let algorithm = make_algorithm(env, policy, config.kwargs(ALGORITHM)?, run_path)
            .map_err(|source| construction(algorithm_id, source))?;
        debug!("constructed algorithm {}", algorithm_id);
        Ok(algorithm)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

/// Construct the algorithm described by `config` with the builtin components.
pub fn prepare_algorithm(
    config: &Config,
    run_path: Option<&Path>,
    checkpoint_path: Option<&Path>,
) -> Result<Box<dyn Algorithm>, AssembleError> {
    Assembler::default().assemble(config, run_path, checkpoint_path)
}

fn construction(identifier: &str, source: ConstructionError) -> AssembleError {
    AssembleError::Construction {
        identifier: identifier.to_owned(),
        source,
    }
}
