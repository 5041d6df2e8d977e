//! Assembly configuration documents
mod tuples;

pub use tuples::{reconstruct_tuples, tag_tuple_list, TUPLE_LIST_FIELD, TUPLE_LIST_TAG};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Constructor keyword arguments for a component.
pub type Kwargs = Map<String, Value>;

/// Identifier key of the environment implementation.
pub const ENV_CLS: &str = "env_cls";
/// Keyword arguments of the environment constructor.
pub const ENV: &str = "env";
/// Identifier key of the policy implementation.
pub const POLICY_CLS: &str = "policy_cls";
/// Keyword arguments of the policy constructor.
pub const POLICY: &str = "policy";
/// Identifier key of the algorithm implementation.
pub const ALGORITHM_CLS: &str = "algorithm_cls";
/// Keyword arguments of the algorithm constructor.
pub const ALGORITHM: &str = "algorithm";

/// A parsed configuration document.
///
/// An ordered mapping that keeps document order. Only the keys used during
/// assembly are ever interpreted; the rest is carried along untouched.
/// Nested sections may be modified in place before assembly to override
/// values from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Map<String, Value>);

impl Config {
    /// Create a configuration from a JSON value, reconstructing tagged tuple lists.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match reconstruct_tuples(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ConfigError::NotAMapping(json_type(&other))),
        }
    }

    /// The dotted component identifier stored under `key`.
    pub fn identifier(&self, key: &'static str) -> Result<&str, ConfigError> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ConfigError::InvalidKey {
                key,
                expected: "string",
            }),
            None => Err(ConfigError::MissingKey(key)),
        }
    }

    /// The constructor keyword arguments stored under `key`.
    pub fn kwargs(&self, key: &'static str) -> Result<&Kwargs, ConfigError> {
        match self.0.get(key) {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(ConfigError::InvalidKey {
                key,
                expected: "mapping",
            }),
            None => Err(ConfigError::MissingKey(key)),
        }
    }

    /// Mutable access to the keyword arguments stored under `key`.
    pub fn kwargs_mut(&mut self, key: &'static str) -> Result<&mut Kwargs, ConfigError> {
        match self.0.get_mut(key) {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(ConfigError::InvalidKey {
                key,
                expected: "mapping",
            }),
            None => Err(ConfigError::MissingKey(key)),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Config {
    type Target = Map<String, Value>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Config {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Config {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(s).map_err(|source| ConfigError::Parse {
            path: None,
            source,
        })?;
        Self::from_value(value)
    }
}

/// Load a configuration file.
///
/// The file is parsed as JSON and every tagged tuple list is reconstructed.
/// No semantic validation is performed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: Some(path.to_owned()),
        source,
    })?;
    Config::from_value(value)
}

/// Parse a configuration document from text.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    text.parse()
}

/// Error loading or reading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config document{}", fmt_path(path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("config document must be a mapping, found {0}")]
    NotAMapping(&'static str),
    #[error("malformed tuple list: {reason}")]
    TupleList { reason: String },
    #[error("missing config key `{0}`")]
    MissingKey(&'static str),
    #[error("config key `{key}` must be a {expected}")]
    InvalidKey {
        key: &'static str,
        expected: &'static str,
    },
}

fn fmt_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
