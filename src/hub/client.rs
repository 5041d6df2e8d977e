//! Hugging Face Hub HTTP client
use super::{ArtifactRepo, HubConfig, HubError, RepoDescriptor, RepoFile, RepoSnapshot};
use serde::Deserialize;
use std::io::{self, Write};

/// Blocking client of the Hugging Face Hub HTTP API.
#[derive(Debug, Clone)]
pub struct HubClient {
    config: HubConfig,
    agent: ureq::Agent,
}

/// Response of `/api/models/{repo}/revision/{revision}`.
#[derive(Debug, Deserialize)]
struct ModelInfo {
    sha: String,
    #[serde(default)]
    siblings: Vec<Sibling>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sibling {
    rfilename: String,
    blob_id: Option<String>,
    size: Option<u64>,
    lfs: Option<LfsInfo>,
}

#[derive(Debug, Deserialize)]
struct LfsInfo {
    sha256: String,
    size: u64,
}

impl HubClient {
    pub fn new(config: HubConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { config, agent }
    }

    /// A client configured from environment variables. See [`HubConfig::from_env`].
    pub fn from_env() -> Self {
        Self::new(HubConfig::from_env())
    }

    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    fn info_url(&self, repo: &RepoDescriptor) -> String {
        format!(
            "{}/api/models/{}/revision/{}?blobs=true",
            self.config.endpoint,
            repo.repo_id,
            encode_segment(&repo.revision)
        )
    }

    fn file_url(&self, repo: &RepoDescriptor, commit: &str, path: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.config.endpoint,
            repo.repo_id,
            encode_segment(commit),
            path
        )
    }

    fn get(&self, url: &str) -> Result<ureq::Response, HubError> {
        let mut request = self.agent.get(url);
        if let Some(token) = &self.config.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }
        request.call().map_err(|err| match err {
            ureq::Error::Status(404, _) => HubError::NotFound(url.to_owned()),
            err => HubError::Http {
                url: url.to_owned(),
                source: Box::new(err),
            },
        })
    }
}

impl Default for HubClient {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl ArtifactRepo for HubClient {
    fn list_files(&self, repo: &RepoDescriptor) -> Result<RepoSnapshot, HubError> {
        let url = self.info_url(repo);
        let info: ModelInfo =
            self.get(&url)?
                .into_json()
                .map_err(|err| HubError::Response {
                    url: url.clone(),
                    reason: err.to_string(),
                })?;
        snapshot_from_info(info).map_err(|reason| HubError::Response { url, reason })
    }

    fn download(
        &self,
        repo: &RepoDescriptor,
        commit: &str,
        file: &RepoFile,
        out: &mut dyn Write,
    ) -> Result<u64, HubError> {
        let url = self.file_url(repo, commit, &file.path);
        let mut reader = self.get(&url)?.into_reader();
        Ok(io::copy(&mut reader, out)?)
    }
}

fn snapshot_from_info(info: ModelInfo) -> Result<RepoSnapshot, String> {
    let files = info
        .siblings
        .into_iter()
        .map(|sibling| {
            let (blob_id, size) = match (sibling.lfs, sibling.blob_id) {
                (Some(lfs), _) => (lfs.sha256, Some(lfs.size)),
                (None, Some(blob_id)) => (blob_id, sibling.size),
                (None, None) => return Err(format!("no blob id for `{}`", sibling.rfilename)),
            };
            Ok(RepoFile {
                path: sibling.rfilename,
                blob_id,
                size,
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(RepoSnapshot {
        commit: info.sha,
        files,
    })
}

/// Percent-encode the path separators of a single URL path segment.
fn encode_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('/', "%2F")
}
