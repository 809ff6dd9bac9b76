//! Renderers turning events into terminal or machine output.

pub mod cli;
pub mod json;

pub use cli::{CliRenderer, CliRendererConfig, RenderedLine};
pub use json::JsonRenderer;
