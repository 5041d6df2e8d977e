//! Bundle download into a local content-addressed cache
//!
//! Cache layout under the model path:
//! ```text
//! models--<org>--<name>/
//!     blobs/<blob_id>
//!     snapshots/<commit>/<file>
//!     refs/<revision>             (contains <commit>)
//! ```
//! A blob that is already present is never downloaded again.
use super::validate::{required_patterns, validate, ValidationResult};
use super::{ArtifactRepo, HubError, RepoDescriptor, RepoFile};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default root of the local model cache.
pub const DEFAULT_MODEL_PATH: &str = "../models/";

/// Options of [`fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Root of the local model cache.
    pub model_path: PathBuf,
    /// Validate the repository first and skip the download if it is invalid.
    pub validate: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            validate: false,
        }
    }
}

/// Reason a bundle was not fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("repository is not a valid bundle, missing {:?}", .0.missing)]
    Invalid(ValidationResult),
    #[error("error fetching from repository")]
    Hub(#[from] HubError),
    #[error("error writing {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("repository path `{0}` escapes the cache directory")]
    UnsafePath(String),
}

/// Download the bundle files of a repository into the local cache.
///
/// Only files matching [`REQUIRED_PATTERNS`](super::REQUIRED_PATTERNS) are downloaded.
/// Returns the snapshot directory holding the files.
///
/// If `options.validate` is set and the repository is not a valid bundle,
/// returns [`FetchError::Invalid`] without downloading anything.
pub fn fetch<R: ArtifactRepo + ?Sized>(
    client: &R,
    repo: &RepoDescriptor,
    options: &FetchOptions,
) -> Result<PathBuf, FetchError> {
    if options.validate {
        let result = validate(client, repo);
        if !result.is_valid {
            info!(
                "not fetching {}: missing {:?}",
                repo.repo_id, result.missing
            );
            return Err(FetchError::Invalid(result));
        }
    }

    let snapshot = client.list_files(repo)?;
    let patterns = required_patterns();
    let repo_dir = options.model_path.join(repo.cache_dir_name());
    let blobs_dir = repo_dir.join("blobs");
    let snapshot_dir = repo_dir.join("snapshots").join(safe_path(&snapshot.commit)?);
    let ref_path = repo_dir.join("refs").join(safe_path(&repo.revision)?);

    // Every path is checked before anything is written.
    let planned = snapshot
        .files
        .iter()
        .filter(|f| patterns.iter().any(|p| p.matches(&f.path)))
        .map(|file| {
            Ok((
                file,
                blobs_dir.join(safe_path(&file.blob_id)?),
                snapshot_dir.join(safe_path(&file.path)?),
            ))
        })
        .collect::<Result<Vec<_>, FetchError>>()?;

    create_dir_all(&blobs_dir)?;
    create_dir_all(&snapshot_dir)?;
    for (file, blob, target) in &planned {
        if blob.is_file() {
            debug!("{} is cached as {}", file.path, file.blob_id);
        } else {
            download_blob(client, repo, &snapshot.commit, file, blob)?;
        }

        if !target.is_file() {
            if let Some(parent) = target.parent() {
                create_dir_all(parent)?;
            }
            link_or_copy(blob, target)?;
        }
    }

    if let Some(parent) = ref_path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(&ref_path, &snapshot.commit).map_err(io_error(&ref_path))?;

    info!(
        "fetched {} at {} into {}",
        repo.repo_id,
        repo.revision,
        snapshot_dir.display()
    );
    Ok(snapshot_dir)
}

/// Download into `<blob>.incomplete` then move into place.
///
/// The partial file is removed if the transfer fails.
fn download_blob<R: ArtifactRepo + ?Sized>(
    client: &R,
    repo: &RepoDescriptor,
    commit: &str,
    file: &RepoFile,
    blob: &Path,
) -> Result<(), FetchError> {
    let mut partial = blob.as_os_str().to_owned();
    partial.push(".incomplete");
    let partial = PathBuf::from(partial);

    debug!("downloading {} ({})", file.path, file.blob_id);
    let out = File::create(&partial).map_err(io_error(&partial))?;
    let result = write_blob(client, repo, commit, file, out, &partial);
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result?;
    fs::rename(&partial, blob).map_err(io_error(blob))
}

/// Transfer `file` into `out`, checking the size when it is known.
fn write_blob<R: ArtifactRepo + ?Sized>(
    client: &R,
    repo: &RepoDescriptor,
    commit: &str,
    file: &RepoFile,
    out: File,
    partial: &Path,
) -> Result<(), FetchError> {
    let mut out = BufWriter::new(out);
    let written = client.download(repo, commit, file, &mut out)?;
    out.flush().map_err(io_error(partial))?;
    match file.size {
        Some(expected) if written != expected => Err(HubError::Response {
            url: file.path.clone(),
            reason: format!("expected {} bytes, received {}", expected, written),
        }
        .into()),
        _ => Ok(()),
    }
}

fn link_or_copy(blob: &Path, target: &Path) -> Result<(), FetchError> {
    if fs::hard_link(blob, target).is_ok() {
        return Ok(());
    }
    fs::copy(blob, target).map(|_| ()).map_err(io_error(target))
}

fn create_dir_all(path: &Path) -> Result<(), FetchError> {
    fs::create_dir_all(path).map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FetchError {
    let path = path.to_owned();
    move |source| FetchError::Io { path, source }
}

/// A relative path made only of normal components.
fn safe_path(path: &str) -> Result<&Path, FetchError> {
    let p = Path::new(path);
    if !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_))) {
        Ok(p)
    } else {
        Err(FetchError::UnsafePath(path.to_owned()))
    }
}
