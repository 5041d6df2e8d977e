//! Configuration-driven assembly of reinforcement learning components.
//!
//! A configuration names an environment, a policy and an algorithm by dotted
//! identifier together with their constructor arguments.
//! [`prepare_algorithm`] resolves the identifiers in a [`Registry`], builds the
//! environment, hands its symmetries to the policy, optionally restores the
//! policy parameters from a checkpoint and finally builds the algorithm.
//! The [`hub`] module validates and downloads pretrained bundles.
#![warn(clippy::cast_lossless)]
#![warn(clippy::cast_possible_truncation)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::for_kv_map)]
#![warn(clippy::missing_const_for_fn)] // has some false positives
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::use_self)] // also triggered by macro expansions
pub mod algorithms;
pub mod assemble;
pub mod builtin;
pub mod checkpoint;
pub mod config;
pub mod envs;
mod error;
pub mod hub;
pub mod policies;
pub mod registry;
#[cfg(test)]
mod testing;

pub use algorithms::Algorithm;
pub use assemble::{prepare_algorithm, Assembler};
pub use config::{load_config, parse_config, Config};
pub use envs::Environment;
pub use error::AssembleError;
pub use policies::Policy;
pub use registry::Registry;
