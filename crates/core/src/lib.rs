//! Core of the tend task orchestrator.
//!
//! - [`tasks`]: the task model, the declaration-ordered [`TaskRegistry`], the
//!   process executor and the dependency-ordered [`TaskRunner`]
//! - [`config`]: loading `tend.toml` into a registry
//! - [`error`]: the [`Error`] type shared by all of the above

pub mod config;
pub mod error;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
pub use tasks::{Task, TaskKind, TaskRegistry, TaskRunner};
