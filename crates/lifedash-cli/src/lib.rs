//! CLI configuration, secret references, and commands
//!
//! This crate provides the `lifedash` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod runtime;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use runtime::Runtime;
