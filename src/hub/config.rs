//! Hub client configuration
use log::warn;
use std::env;
use std::time::Duration;

/// Connection settings for [`HubClient`](super::HubClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Base URL of the hub, without a trailing slash.
    pub endpoint: String,
    /// Access token sent as a bearer token.
    pub token: Option<String>,
    /// Timeout of each read from the hub.
    ///
    /// This bounds a stalled transfer, not the whole download, so large files
    /// on slow links still complete.
    pub timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl HubConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://huggingface.co";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Configuration from the `HF_ENDPOINT`, `HF_TOKEN` (or `HUGGING_FACE_HUB_TOKEN`)
    /// and `HF_HUB_TIMEOUT` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = Self::default();
        if let Some(endpoint) = var("HF_ENDPOINT") {
            config.endpoint = endpoint.trim_end_matches('/').to_owned();
        }
        config.token = var("HF_TOKEN").or_else(|| var("HUGGING_FACE_HUB_TOKEN"));
        if let Some(timeout) = var("HF_HUB_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => warn!(
                    "ignoring invalid HF_HUB_TIMEOUT {:?}; using {}s",
                    timeout, Self::DEFAULT_TIMEOUT_SECS
                ),
            }
        }
        config
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
            token: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: concat!("plugrl/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}
