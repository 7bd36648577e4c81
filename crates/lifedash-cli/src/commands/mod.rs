//! Subcommand implementations.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod health;
pub mod token;
