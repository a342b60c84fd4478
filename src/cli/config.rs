// src/cli/config.rs
// Validated run configuration derived from the command line
// RELEVANT FILES: src/cli/args.rs, src/error.rs, src/bake/pipeline.rs

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::args::Args;
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BakeConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub validation_dir: Option<PathBuf>,
    pub kernel_dir: Option<PathBuf>,
}

fn ensure_dir_or_absent(role: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.exists() && !path.is_dir() {
        return Err(ConfigError::NotADirectory {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn create_dir(role: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        return Ok(());
    }
    info!("Creating {} directory {}", role.to_lowercase(), path.display());
    fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
        role,
        path: path.to_path_buf(),
        source,
    })
}

impl BakeConfig {
    /// Check the directories named by `args`. Nothing is created here.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if !args.input_dir.is_dir() {
            return Err(ConfigError::InvalidInputDir(args.input_dir));
        }
        ensure_dir_or_absent("Output", &args.output_dir)?;
        if let Some(dir) = &args.validation_dir {
            ensure_dir_or_absent("Validation", dir)?;
        }
        Ok(Self {
            input_dir: args.input_dir,
            output_dir: args.output_dir,
            validation_dir: args.validation_dir,
            kernel_dir: args.kernel_dir,
        })
    }

    /// Create the output and validation directories when missing.
    pub fn prepare_output_dirs(&self) -> Result<(), ConfigError> {
        create_dir("Output", &self.output_dir)?;
        if let Some(dir) = &self.validation_dir {
            create_dir("Validation", dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &Path, output: &Path, validation: Option<&Path>) -> Args {
        Args {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            validation_dir: validation.map(Path::to_path_buf),
            kernel_dir: None,
        }
    }

    #[test]
    fn missing_input_dir_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = BakeConfig::from_args(args(
            &root.path().join("nope"),
            &root.path().join("out"),
            None,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInputDir(_)));
    }

    #[test]
    fn file_in_place_of_output_dir_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("out");
        fs::write(&blocker, b"x").unwrap();
        let err = BakeConfig::from_args(args(root.path(), &blocker, None)).unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory { role: "Output", .. }));

        let err = BakeConfig::from_args(args(
            root.path(),
            &root.path().join("fresh"),
            Some(&blocker),
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory { role: "Validation", .. }));
    }

    #[test]
    fn prepare_creates_missing_directories() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("a").join("out");
        let val = root.path().join("val");
        let config = BakeConfig::from_args(args(root.path(), &out, Some(&val))).unwrap();
        config.prepare_output_dirs().unwrap();
        assert!(out.is_dir());
        assert!(val.is_dir());
        // second call is a no-op
        config.prepare_output_dirs().unwrap();
    }
}
