//! Central error handling for the baker
//!
//! Provides a unified BakeError enum whose kinds let the pipeline decide
//! between aborting the run and skipping a single input or set.

use std::path::PathBuf;

/// Configuration problems detected before any GPU work begins.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid input directory: {}", .0.display())]
    InvalidInputDir(PathBuf),

    #[error("{role} directory exists and is not a folder: {}", .path.display())]
    NotADirectory { role: &'static str, path: PathBuf },

    #[error("Failed to create {role} directory {}: {source}", .path.display())]
    CreateDir {
        role: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Centralized error type for all baking operations
#[derive(thiserror::Error, Debug)]
pub enum BakeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Init error: {0}")]
    Init(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BakeError {
    pub fn category(&self) -> &'static str {
        match self {
            BakeError::Config(_) => "Config",
            BakeError::Init(_) => "Init",
            BakeError::Compile(_) => "Compile",
            BakeError::Asset(_) => "Asset",
            BakeError::Capture(_) => "Capture",
            BakeError::Persist(_) => "Persist",
            BakeError::Device(_) => "Device",
            BakeError::Io(_) => "IO",
        }
    }

    /// Only a malformed input asset is skipped; every other kind ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BakeError::Asset(_))
    }

    /// Process exit status reported by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BakeError::Config(ConfigError::InvalidInputDir(_)) => 3,
            BakeError::Config(_) => 4,
            BakeError::Init(_) => 5,
            BakeError::Compile(_) => 6,
            BakeError::Capture(_) | BakeError::Persist(_) => 7,
            BakeError::Device(_) => 8,
            BakeError::Asset(_) | BakeError::Io(_) => 1,
        }
    }

    /// Convenience constructors for common error types
    pub fn init<T: ToString>(msg: T) -> Self {
        BakeError::Init(msg.to_string())
    }

    pub fn compile<T: ToString>(msg: T) -> Self {
        BakeError::Compile(msg.to_string())
    }

    pub fn asset<T: ToString>(msg: T) -> Self {
        BakeError::Asset(msg.to_string())
    }

    pub fn capture<T: ToString>(msg: T) -> Self {
        BakeError::Capture(msg.to_string())
    }

    pub fn persist<T: ToString>(msg: T) -> Self {
        BakeError::Persist(msg.to_string())
    }

    pub fn device<T: ToString>(msg: T) -> Self {
        BakeError::Device(msg.to_string())
    }
}

/// Result type alias for baking operations
pub type BakeResult<T> = Result<T, BakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_asset_errors_are_recoverable() {
        assert!(BakeError::asset("bad.dds").is_recoverable());
        assert!(!BakeError::persist("x").is_recoverable());
        assert!(!BakeError::capture("x").is_recoverable());
        assert!(!BakeError::compile("x").is_recoverable());
        assert!(!BakeError::init("x").is_recoverable());
    }

    #[test]
    fn exit_codes_distinguish_fatal_kinds() {
        let codes = [
            BakeError::Config(ConfigError::InvalidInputDir("in".into())).exit_code(),
            BakeError::Config(ConfigError::NotADirectory {
                role: "Output",
                path: "out".into(),
            })
            .exit_code(),
            BakeError::init("no adapter").exit_code(),
            BakeError::compile("syntax").exit_code(),
            BakeError::persist("disk full").exit_code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.iter().all(|&c| c != 0));
    }

    #[test]
    fn display_carries_category_and_path() {
        let err = BakeError::Config(ConfigError::NotADirectory {
            role: "Validation",
            path: "valid.txt".into(),
        });
        let msg = err.to_string();
        assert!(msg.starts_with("Config error"));
        assert!(msg.contains("valid.txt"));
        assert_eq!(err.category(), "Config");
    }
}
