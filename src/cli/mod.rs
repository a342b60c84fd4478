//! Command-line surface: argument parsing and run configuration.

pub mod args;
pub mod config;
pub mod runner;

pub use args::Args;
pub use config::BakeConfig;
