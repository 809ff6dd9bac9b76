//! tend - run named tasks and their dependencies, in order.
//!
//! The binary is a thin wrapper around this library: [`cli`] defines the
//! command line and maps errors to exit codes, [`commands`] carries out the
//! requested action against a loaded task file and [`logging`] installs the
//! tracing subscriber that renders task events.

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations (run, list, check, dry run, init).
pub mod commands;
/// Tracing and event renderer setup.
pub mod logging;
