//! Subcommand implementations.

pub mod apply;
pub mod config;
pub mod kernels;
