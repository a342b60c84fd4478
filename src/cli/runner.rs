// src/cli/runner.rs
// Entry point behind the cloud-bakery binary: logging, argument parsing and exit status
// RELEVANT FILES: src/bin/cloud_bakery.rs, src/cli/config.rs, src/bake/pipeline.rs

use std::process::ExitCode;

use clap::Parser;
use log::{error, warn};

use super::{Args, BakeConfig};
use crate::error::BakeError;

pub fn run_bakery_cli() -> ExitCode {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    let result = BakeConfig::from_args(args)
        .map_err(BakeError::from)
        .and_then(|config| crate::bake::run(&config));

    match result {
        Ok(summary) => {
            for rejection in &summary.skipped {
                warn!("Skipped {}: {}", rejection.key(), rejection);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{} failure: {}", err.category(), err);
            ExitCode::from(err.exit_code())
        }
    }
}
