//! Error type
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::registry::{ConstructionError, ResolveError};
use thiserror::Error;

/// Error assembling an algorithm from a configuration.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("error constructing '{identifier}': {source}")]
    Construction {
        identifier: String,
        #[source]
        source: ConstructionError,
    },
    #[error("error restoring checkpoint")]
    Checkpoint(#[from] CheckpointError),
}
