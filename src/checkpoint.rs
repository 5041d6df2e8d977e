//! Policy parameter checkpoints
//!
//! A checkpoint is a tch multi-tensor archive mapping parameter names to tensors,
//! as written by [`save`] (or `VarStore::save`).
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tch::{nn::VarStore, Device, TchError, Tensor};
use thiserror::Error;

/// Error restoring a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("error reading checkpoint {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: TchError,
    },
    #[error("error writing checkpoint {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: TchError,
    },
    #[error("checkpoint is missing parameter `{0}`")]
    MissingParameter(String),
    #[error("checkpoint has unexpected parameter `{0}`")]
    UnexpectedParameter(String),
    #[error("parameter `{name}` has shape {found:?} in checkpoint but {expected:?} in policy")]
    ShapeMismatch {
        name: String,
        expected: Vec<i64>,
        found: Vec<i64>,
    },
    #[error("error copying parameter `{name}`")]
    Copy {
        name: String,
        #[source]
        source: TchError,
    },
}

/// Read the named tensors of a checkpoint into CPU memory.
///
/// The device the tensors were saved from is ignored.
pub fn load_tensors<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Tensor>, CheckpointError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CheckpointError::NotFound(path.to_owned()));
    }
    let named = Tensor::load_multi_with_device(path, Device::Cpu).map_err(|source| {
        CheckpointError::Read {
            path: path.to_owned(),
            source,
        }
    })?;
    Ok(named.into_iter().collect())
}

/// Overwrite the variables of `vs` in place with the parameters of a checkpoint.
///
/// The checkpoint must hold exactly the variables of `vs` with matching shapes.
/// Nothing is modified unless every parameter matches.
pub fn restore<P: AsRef<Path>>(vs: &VarStore, path: P) -> Result<(), CheckpointError> {
    let saved = load_tensors(path)?;
    let mut variables = vs.variables();

    for (name, var) in &variables {
        let src = saved
            .get(name)
            .ok_or_else(|| CheckpointError::MissingParameter(name.clone()))?;
        let (expected, found) = (var.size(), src.size());
        if expected != found {
            return Err(CheckpointError::ShapeMismatch {
                name: name.clone(),
                expected,
                found,
            });
        }
    }
    if let Some(name) = saved.keys().find(|name| !variables.contains_key(*name)) {
        return Err(CheckpointError::UnexpectedParameter(name.clone()));
    }

    tch::no_grad(|| -> Result<(), CheckpointError> {
        for (name, var) in variables.iter_mut() {
            var.f_copy_(&saved[name])
                .map_err(|source| CheckpointError::Copy {
                    name: name.clone(),
                    source,
                })?;
        }
        Ok(())
    })
}

/// Save the variables of `vs` as a checkpoint.
pub fn save<P: AsRef<Path>>(vs: &VarStore, path: P) -> Result<(), CheckpointError> {
    let path = path.as_ref();
    vs.save(path).map_err(|source| CheckpointError::Write {
        path: path.to_owned(),
        source,
    })
}
