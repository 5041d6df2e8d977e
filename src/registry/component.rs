//! Resolvable components and their factories
use crate::algorithms::Algorithm;
use crate::config::Kwargs;
use crate::envs::Environment;
use crate::policies::{Policy, PolicyArgs};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Construct an environment from keyword arguments.
pub type EnvFactory = Rc<dyn Fn(&Kwargs) -> Result<Box<dyn Environment>, ConstructionError>>;

/// Construct a policy from the environment structure and keyword arguments.
pub type PolicyFactory =
    Rc<dyn Fn(PolicyArgs<'_>) -> Result<Box<dyn Policy>, ConstructionError>>;

/// Construct an algorithm that takes ownership of an environment and a policy.
///
/// # Args
/// * environment
/// * policy
/// * algorithm keyword arguments
/// * optional run path for the algorithm's own artifacts
pub type AlgorithmFactory = Rc<
    dyn Fn(
        Box<dyn Environment>,
        Box<dyn Policy>,
        &Kwargs,
        Option<&Path>,
    ) -> Result<Box<dyn Algorithm>, ConstructionError>,
>;

/// A named attribute of a plugin module.
#[derive(Clone)]
pub enum Component {
    Environment(EnvFactory),
    Policy(PolicyFactory),
    Algorithm(AlgorithmFactory),
}

impl Component {
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::Environment(_) => ComponentKind::Environment,
            Self::Policy(_) => ComponentKind::Policy,
            Self::Algorithm(_) => ComponentKind::Algorithm,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{:?}", self.kind())
    }
}

/// The family a component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Environment,
    Policy,
    Algorithm,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Environment => "environment",
            Self::Policy => "policy",
            Self::Algorithm => "algorithm",
        };
        f.write_str(name)
    }
}

/// Error raised by a component constructor.
///
/// Opaque to the assembler; the plugin owns the meaning of the inner error.
#[derive(Debug)]
pub struct ConstructionError(Box<dyn Error + Send + Sync>);

impl ConstructionError {
    pub fn new<E: Into<Box<dyn Error + Send + Sync>>>(error: E) -> Self {
        Self(error.into())
    }

    /// The same named argument was supplied twice.
    pub fn duplicate_argument(name: &str) -> Self {
        Self::new(format!("got multiple values for argument `{}`", name))
    }

    pub fn into_inner(self) -> Box<dyn Error + Send + Sync> {
        self.0
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for ConstructionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Decode keyword arguments into a typed parameter struct.
///
/// Parameter structs should use `#[serde(deny_unknown_fields)]` so that
/// unexpected keyword arguments are rejected.
pub fn parse_kwargs<T: DeserializeOwned>(kwargs: &Kwargs) -> Result<T, ConstructionError> {
    serde_json::from_value(Value::Object(kwargs.clone())).map_err(ConstructionError::new)
}
