//! Resolution of dotted component identifiers
//!
//! A [`Registry`] maps module paths to loaders. A loader fills a [`Module`]
//! with named components the first time any identifier under that path is
//! resolved. The populated module is cached for the lifetime of the registry,
//! so the same identifier always resolves to the same factory.
mod component;

pub use component::{
    parse_kwargs, AlgorithmFactory, Component, ComponentKind, ConstructionError, EnvFactory,
    PolicyFactory,
};

use crate::algorithms::Algorithm;
use crate::config::Kwargs;
use crate::envs::Environment;
use crate::policies::{Policy, PolicyArgs};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Module initialization; registers the module's components.
pub type ModuleLoader = Box<dyn Fn(&mut Module)>;

/// A named collection of components.
pub struct Module {
    path: String,
    attributes: HashMap<String, Component>,
}

impl Module {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.attributes.get(name)
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, component: Component) -> &mut Self {
        self.attributes.insert(name.into(), component);
        self
    }

    /// Register an environment constructor.
    pub fn add_env<S, F>(&mut self, name: S, factory: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(&Kwargs) -> Result<Box<dyn Environment>, ConstructionError> + 'static,
    {
        self.insert(name, Component::Environment(Rc::new(factory)))
    }

    /// Register a policy constructor.
    pub fn add_policy<S, F>(&mut self, name: S, factory: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(PolicyArgs<'_>) -> Result<Box<dyn Policy>, ConstructionError> + 'static,
    {
        self.insert(name, Component::Policy(Rc::new(factory)))
    }

    /// Register an algorithm constructor.
    pub fn add_algorithm<S, F>(&mut self, name: S, factory: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(
                Box<dyn Environment>,
                Box<dyn Policy>,
                &Kwargs,
                Option<&Path>,
            ) -> Result<Box<dyn Algorithm>, ConstructionError>
            + 'static,
    {
        self.insert(name, Component::Algorithm(Rc::new(factory)))
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.attributes.keys().collect();
        names.sort();
        f.debug_struct("Module")
            .field("path", &self.path)
            .field("attributes", &names)
            .finish()
    }
}

/// Registry of plugin modules with a cache of loaded modules.
#[derive(Default)]
pub struct Registry {
    loaders: HashMap<String, ModuleLoader>,
    loaded: HashMap<String, Rc<Module>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the reference plugins of this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register(&mut registry);
        registry
    }

    /// Register a module loader under a module path.
    ///
    /// Replaces any previous loader for the path and drops a cached copy of the module.
    pub fn register_module<S, F>(&mut self, path: S, loader: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(&mut Module) + 'static,
    {
        let path = path.into();
        self.loaded.remove(&path);
        self.loaders.insert(path, Box::new(loader));
        self
    }

    /// Whether the module at `path` has been loaded.
    pub fn is_loaded(&self, path: &str) -> bool {
        self.loaded.contains_key(path)
    }

    /// Drop all loaded modules. Loaders stay registered.
    pub fn clear_cache(&mut self) {
        self.loaded.clear();
    }

    /// Load a module, running its loader only on first use.
    pub fn load_module(&mut self, path: &str) -> Option<Rc<Module>> {
        if let Some(module) = self.loaded.get(path) {
            return Some(Rc::clone(module));
        }
        let loader = self.loaders.get(path)?;
        let mut module = Module::new(path);
        loader(&mut module);
        debug!("loaded module {:?}", module);
        let module = Rc::new(module);
        self.loaded.insert(path.to_owned(), Rc::clone(&module));
        Some(module)
    }

    /// Resolve a `<module-path>.<attribute>` identifier.
    pub fn resolve(&mut self, identifier: &str) -> Result<Component, ResolveError> {
        let (module_path, attribute) =
            identifier
                .rsplit_once('.')
                .ok_or_else(|| ResolveError::MissingSeparator {
                    identifier: identifier.to_owned(),
                })?;
        let module = self
            .load_module(module_path)
            .ok_or_else(|| ResolveError::ModuleNotFound {
                identifier: identifier.to_owned(),
                module: module_path.to_owned(),
            })?;
        module
            .get(attribute)
            .cloned()
            .ok_or_else(|| ResolveError::AttributeNotFound {
                identifier: identifier.to_owned(),
                module: module_path.to_owned(),
                attribute: attribute.to_owned(),
            })
    }

    pub fn resolve_env(&mut self, identifier: &str) -> Result<EnvFactory, ResolveError> {
        match self.resolve(identifier)? {
            Component::Environment(factory) => Ok(factory),
            other => Err(wrong_kind(identifier, ComponentKind::Environment, &other)),
        }
    }

    pub fn resolve_policy(&mut self, identifier: &str) -> Result<PolicyFactory, ResolveError> {
        match self.resolve(identifier)? {
            Component::Policy(factory) => Ok(factory),
            other => Err(wrong_kind(identifier, ComponentKind::Policy, &other)),
        }
    }

    pub fn resolve_algorithm(
        &mut self,
        identifier: &str,
    ) -> Result<AlgorithmFactory, ResolveError> {
        match self.resolve(identifier)? {
            Component::Algorithm(factory) => Ok(factory),
            other => Err(wrong_kind(identifier, ComponentKind::Algorithm, &other)),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<_> = self.loaders.keys().collect();
        modules.sort();
        let mut loaded: Vec<_> = self.loaded.keys().collect();
        loaded.sort();
        f.debug_struct("Registry")
            .field("modules", &modules)
            .field("loaded", &loaded)
            .finish()
    }
}

fn wrong_kind(identifier: &str, expected: ComponentKind, found: &Component) -> ResolveError {
    ResolveError::WrongKind {
        identifier: identifier.to_owned(),
        expected,
        found: found.kind(),
    }
}

/// Error resolving a component identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("could not resolve '{identifier}': expected '<module>.<name>'")]
    MissingSeparator { identifier: String },
    #[error("could not resolve '{identifier}': no module named '{module}'")]
    ModuleNotFound { identifier: String, module: String },
    #[error("could not resolve '{identifier}': module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound {
        identifier: String,
        module: String,
        attribute: String,
    },
    #[error("could not resolve '{identifier}': expected {expected}, found {found}")]
    WrongKind {
        identifier: String,
        expected: ComponentKind,
        found: ComponentKind,
    },
}

impl ResolveError {
    /// The identifier as it was given.
    pub fn identifier(&self) -> &str {
        match self {
            Self::MissingSeparator { identifier }
            | Self::ModuleNotFound { identifier, .. }
            | Self::AttributeNotFound { identifier, .. }
            | Self::WrongKind { identifier, .. } => identifier,
        }
    }
}
