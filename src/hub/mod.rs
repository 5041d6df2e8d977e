//! Validation and download of pretrained model bundles from an artifact repository
//!
//! A bundle is usable if it has at least one file matching each of
//! [`REQUIRED_PATTERNS`]: a configuration and a policy checkpoint.
mod client;
mod config;
mod fetch;
mod validate;

pub use client::HubClient;
pub use config::HubConfig;
pub use fetch::{fetch, FetchError, FetchOptions, DEFAULT_MODEL_PATH};
pub use validate::{validate, ValidationResult, REPO_NOT_FOUND};

use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Glob patterns of the files a bundle needs. Also the set of files that are downloaded.
pub const REQUIRED_PATTERNS: [&str; 2] = ["*.json", "*.pt"];

/// Revision used when none is given; the default branch.
pub const DEFAULT_REVISION: &str = "main";

/// A repository at a revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoDescriptor {
    /// Repository id of the form `<org>/<name>`.
    pub repo_id: String,
    /// Branch, tag or commit.
    pub revision: String,
}

impl RepoDescriptor {
    /// A repository at the default revision.
    pub fn new<S: Into<String>>(repo_id: S) -> Self {
        Self::with_revision(repo_id, DEFAULT_REVISION)
    }

    pub fn with_revision<S: Into<String>, R: Into<String>>(repo_id: S, revision: R) -> Self {
        Self {
            repo_id: repo_id.into(),
            revision: revision.into(),
        }
    }

    /// Name of the repository's directory in a local cache: `models--<org>--<name>`.
    pub fn cache_dir_name(&self) -> String {
        format!("models--{}", self.repo_id.replace('/', "--"))
    }
}

/// A file in a repository snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    /// Path relative to the repository root.
    pub path: String,
    /// Content address of the file. Identical contents have identical ids.
    pub blob_id: String,
    /// Size in bytes, if known.
    pub size: Option<u64>,
}

/// The files of a repository at a resolved commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    /// Commit the revision resolved to.
    pub commit: String,
    pub files: Vec<RepoFile>,
}

/// Client of a remote artifact repository.
pub trait ArtifactRepo {
    /// List the files of a repository at its revision.
    fn list_files(&self, repo: &RepoDescriptor) -> Result<RepoSnapshot, HubError>;

    /// Write the contents of `file` at `commit` to `out`. Returns the number of bytes written.
    fn download(
        &self,
        repo: &RepoDescriptor,
        commit: &str,
        file: &RepoFile,
        out: &mut dyn Write,
    ) -> Result<u64, HubError>;
}

/// Error communicating with an artifact repository.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("unexpected response from {url}: {reason}")]
    Response { url: String, reason: String },
    #[error("transfer error")]
    Io(#[from] io::Error),
}

/// Check whether a repository on the hub has the files of a model bundle.
///
/// Uses a [`HubClient`] configured from the environment.
pub fn validate_from_hub(repo_id: &str, revision: &str) -> ValidationResult {
    validate(
        &HubClient::from_env(),
        &RepoDescriptor::with_revision(repo_id, revision),
    )
}

/// Download a model bundle from the hub into the cache at `model_path`.
///
/// Returns the local directory holding the bundle files.
/// Uses a [`HubClient`] configured from the environment.
pub fn pull_from_hub<P: Into<PathBuf>>(
    repo_id: &str,
    model_path: P,
    revision: &str,
    validate: bool,
) -> Result<PathBuf, FetchError> {
    fetch(
        &HubClient::from_env(),
        &RepoDescriptor::with_revision(repo_id, revision),
        &FetchOptions {
            model_path: model_path.into(),
            validate,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_to_main() {
        let repo = RepoDescriptor::new("org/name");
        assert_eq!(repo.revision, "main");
    }

    #[test]
    fn cache_dir_name() {
        assert_eq!(
            RepoDescriptor::new("org/name").cache_dir_name(),
            "models--org--name"
        );
    }
}
