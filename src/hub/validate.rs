//! Bundle validation
use super::{ArtifactRepo, RepoDescriptor, REQUIRED_PATTERNS};
use glob::Pattern;
use log::warn;

/// Reported as the only missing entry when the repository cannot be listed.
pub const REPO_NOT_FOUND: &str = "<repo not found>";

/// Outcome of validating a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Required patterns no file matched, or [`REPO_NOT_FOUND`].
    pub missing: Vec<String>,
}

impl ValidationResult {
    fn repo_not_found() -> Self {
        Self {
            is_valid: false,
            missing: vec![REPO_NOT_FOUND.to_owned()],
        }
    }
}

/// The compiled [`REQUIRED_PATTERNS`].
pub(super) fn required_patterns() -> Vec<Pattern> {
    REQUIRED_PATTERNS
        .iter()
        .map(|p| Pattern::new(p).expect("required patterns are valid globs"))
        .collect()
}

/// Check that a repository has at least one file matching each required pattern.
///
/// Never fails: a repository that cannot be listed is reported as invalid
/// with `missing == [REPO_NOT_FOUND]`.
pub fn validate<R: ArtifactRepo + ?Sized>(client: &R, repo: &RepoDescriptor) -> ValidationResult {
    let snapshot = match client.list_files(repo) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(
                "could not list {} at {}: {}",
                repo.repo_id, repo.revision, err
            );
            return ValidationResult::repo_not_found();
        }
    };

    let missing: Vec<String> = required_patterns()
        .into_iter()
        .filter(|pattern| !snapshot.files.iter().any(|f| pattern.matches(&f.path)))
        .map(|pattern| pattern.as_str().to_owned())
        .collect();
    ValidationResult {
        is_valid: missing.is_empty(),
        missing,
    }
}
