//! Edgebuild library exports.
//!
//! The binary is a thin CLI over these modules; integration tests drive the
//! pipeline directly with a fake registry client.

pub mod builder;
pub mod commands;
pub mod config;
pub mod error;
pub mod module;
pub mod output;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod registry;
pub mod timing;

pub use error::{EdgeError, RegistryError};
pub use pipeline::{Mode, Pipeline, PipelineSettings, RunReport};
