//! Stub components for testing
use crate::algorithms::{Algorithm, CollectStats, Collected};
use crate::config::Kwargs;
use crate::envs::{Environment, Permutation, Twists};
use crate::hub::{ArtifactRepo, HubError, RepoDescriptor, RepoFile, RepoSnapshot};
use crate::policies::{Policy, PolicyArgs};
use crate::registry::{parse_kwargs, Registry};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tch::{nn::VarStore, Device};

/// Component lifecycle events recorded by the stub module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    EnvBuilt,
    Twists,
    PolicyBuilt,
    AlgorithmBuilt,
}

/// Shared record of what the stub components observed.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: RefCell<Vec<Event>>,
    /// Permutations the stub policy was constructed with.
    pub policy_twists: RefCell<Option<Twists>>,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

/// Sentinel twists for a stub environment of the given size.
///
/// One observation rotation paired with an action swap.
pub fn sentinel_twists(size: usize) -> Twists {
    let rotation: Permutation = (0..size).map(|i| (i + 1) % size).collect();
    (vec![rotation], vec![vec![1, 0]])
}

/// Stub environment with `size` observation features and two actions.
///
/// Every step gives reward 1; the episode ends after `episode_length` steps.
#[derive(Debug)]
pub struct StubEnv {
    pub size: usize,
    pub episode_length: usize,
    pub steps: usize,
    pub recorder: Option<Rc<Recorder>>,
}

impl Default for StubEnv {
    fn default() -> Self {
        Self {
            size: 2,
            episode_length: 1,
            steps: 0,
            recorder: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StubEnvConfig {
    size: usize,
}

impl Environment for StubEnv {
    fn reset(&mut self) {
        self.steps = 0;
    }

    fn step(&mut self, _action: usize) {
        self.steps += 1;
    }

    fn is_final(&self) -> bool {
        self.steps >= self.episode_length
    }

    fn reward(&self) -> f32 {
        1.0
    }

    fn state(&self) -> Vec<i64> {
        vec![self.steps as i64]
    }

    fn observe(&self) -> Vec<f32> {
        vec![0.0; self.size]
    }

    fn obs_shape(&self) -> Vec<usize> {
        vec![self.size]
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn twists(&self) -> Twists {
        if let Some(recorder) = &self.recorder {
            recorder.push(Event::Twists);
        }
        sentinel_twists(self.size)
    }
}

/// Stub policy that keeps its constructor arguments.
#[derive(Debug)]
pub struct StubPolicy {
    pub obs_shape: Vec<usize>,
    pub num_actions: usize,
    pub kwargs: Kwargs,
    pub obs_perms: Vec<Permutation>,
    pub act_perms: Vec<Permutation>,
    vs: VarStore,
}

impl StubPolicy {
    pub fn new(args: &PolicyArgs) -> Self {
        Self {
            obs_shape: args.obs_shape.clone(),
            num_actions: args.num_actions,
            kwargs: args.kwargs.clone(),
            obs_perms: args.obs_perms.clone(),
            act_perms: args.act_perms.clone(),
            vs: VarStore::new(Device::Cpu),
        }
    }
}

impl Policy for StubPolicy {
    fn predict(&self, _obs: &[f32], masks: &[bool]) -> Vec<f32> {
        (0..self.num_actions)
            .map(|a| match masks.get(a) {
                Some(false) => f32::NEG_INFINITY,
                _ => 0.0,
            })
            .collect()
    }

    fn var_store(&self) -> &VarStore {
        &self.vs
    }
}

/// Stub algorithm that owns its components and collects nothing.
pub struct StubAlgorithm {
    pub env: Box<dyn Environment>,
    pub policy: Box<dyn Policy>,
    pub kwargs: Kwargs,
    pub run_path: Option<PathBuf>,
}

impl Algorithm for StubAlgorithm {
    fn env(&self) -> &dyn Environment {
        &*self.env
    }

    fn env_mut(&mut self) -> &mut dyn Environment {
        &mut *self.env
    }

    fn policy(&self) -> &dyn Policy {
        &*self.policy
    }

    fn run_path(&self) -> Option<&Path> {
        self.run_path.as_deref()
    }

    fn collect(&mut self) -> (Collected, CollectStats) {
        (Collected::default(), CollectStats::default())
    }
}

/// A registry with a `pkg` module of stub components reporting to `recorder`.
///
/// * `pkg.Env` takes a `size` argument.
/// * `pkg.Policy` takes any arguments.
/// * `pkg.Algo` takes any arguments.
pub fn stub_registry(recorder: &Rc<Recorder>) -> Registry {
    let recorder = Rc::clone(recorder);
    let mut registry = Registry::new();
    registry.register_module("pkg", move |module| {
        let env_recorder = Rc::clone(&recorder);
        let policy_recorder = Rc::clone(&recorder);
        let algo_recorder = Rc::clone(&recorder);
        module
            .add_env("Env", move |kwargs| {
                let config: StubEnvConfig = parse_kwargs(kwargs)?;
                env_recorder.push(Event::EnvBuilt);
                Ok(Box::new(StubEnv {
                    size: config.size,
                    recorder: Some(Rc::clone(&env_recorder)),
                    ..StubEnv::default()
                }))
            })
            .add_policy("Policy", move |args| {
                policy_recorder.push(Event::PolicyBuilt);
                *policy_recorder.policy_twists.borrow_mut() =
                    Some((args.obs_perms.clone(), args.act_perms.clone()));
                Ok(Box::new(StubPolicy::new(&args)))
            })
            .add_algorithm("Algo", move |env, policy, kwargs, run_path| {
                algo_recorder.push(Event::AlgorithmBuilt);
                Ok(Box::new(StubAlgorithm {
                    env,
                    policy,
                    kwargs: kwargs.clone(),
                    run_path: run_path.map(Path::to_path_buf),
                }))
            });
    });
    registry
}

/// In-memory artifact repository that counts calls.
#[derive(Debug, Default)]
pub struct StubRepo {
    /// File contents by repository id, then file path.
    pub repos: HashMap<String, Vec<(String, Vec<u8>)>>,
    pub commit: String,
    pub list_calls: Cell<usize>,
    pub downloads: Cell<usize>,
    /// When set, every download writes these bytes then fails.
    pub fail_after: Option<Vec<u8>>,
    /// When set, listed in place of every file's true size.
    pub listed_size: Option<u64>,
}

impl StubRepo {
    pub fn new() -> Self {
        Self {
            commit: "0123abcd".into(),
            ..Self::default()
        }
    }

    pub fn with_files(mut self, repo_id: &str, files: &[(&str, &[u8])]) -> Self {
        self.repos.insert(
            repo_id.into(),
            files
                .iter()
                .map(|(path, data)| ((*path).to_owned(), data.to_vec()))
                .collect(),
        );
        self
    }

    /// Blob id for file contents; distinct contents get distinct ids.
    pub fn blob_id(data: &[u8]) -> String {
        let sum = data
            .iter()
            .fold(data.len() as u64, |h, &b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
        format!("{:016x}", sum)
    }

    fn contents(&self, repo: &RepoDescriptor, path: &str) -> Result<&[u8], HubError> {
        self.repos
            .get(&repo.repo_id)
            .and_then(|files| files.iter().find(|(p, _)| p == path))
            .map(|(_, data)| data.as_slice())
            .ok_or_else(|| HubError::NotFound(format!("{}/{}", repo.repo_id, path)))
    }
}

impl ArtifactRepo for StubRepo {
    fn list_files(&self, repo: &RepoDescriptor) -> Result<RepoSnapshot, HubError> {
        self.list_calls.set(self.list_calls.get() + 1);
        let files = self
            .repos
            .get(&repo.repo_id)
            .ok_or_else(|| HubError::NotFound(repo.repo_id.clone()))?;
        Ok(RepoSnapshot {
            commit: self.commit.clone(),
            files: files
                .iter()
                .map(|(path, data)| RepoFile {
                    path: path.clone(),
                    blob_id: Self::blob_id(data),
                    size: Some(self.listed_size.unwrap_or(data.len() as u64)),
                })
                .collect(),
        })
    }

    fn download(
        &self,
        repo: &RepoDescriptor,
        _commit: &str,
        file: &RepoFile,
        out: &mut dyn Write,
    ) -> Result<u64, HubError> {
        self.downloads.set(self.downloads.get() + 1);
        if let Some(partial) = &self.fail_after {
            out.write_all(partial)?;
            return Err(HubError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset mid-transfer",
            )));
        }
        let data = self.contents(repo, &file.path)?;
        out.write_all(data)?;
        Ok(data.len() as u64)
    }
}
