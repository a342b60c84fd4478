// src/cli/args.rs
// Command-line arguments of the cloud-bakery binary
// RELEVANT FILES: src/cli/config.rs, src/bin/cloud_bakery.rs

use std::path::PathBuf;

use clap::Parser;

/// Bake cloud radiance samples into L2 spherical-harmonic textures.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "cloud-bakery", version, about)]
pub struct Args {
    /// Directory holding `{id}_{face}_tr.dds` and `{id}_{face}_{lx}_{ly}_{lz}.dds` inputs
    #[arg(short = 'i', long = "input-dir", default_value = "./input")]
    pub input_dir: PathBuf,

    /// Directory receiving `{id}_{face}_sh{0,1,2}.dds`
    #[arg(short = 'o', long = "output-dir", default_value = "./output")]
    pub output_dir: PathBuf,

    /// Also reconstruct the last sample of each set into this directory
    #[arg(short = 'v', long = "validation-dir")]
    pub validation_dir: Option<PathBuf>,

    /// Load common.wgsl, bake.wgsl and validation.wgsl from here instead of the built-in kernels
    #[arg(long = "kernel-dir")]
    pub kernel_dir: Option<PathBuf>,
}
