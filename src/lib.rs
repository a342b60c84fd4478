//! Offline baker turning cloud radiance renders into L2 spherical-harmonic textures.
//! Rust: wgpu 0.19 compute kernels; DDS in, BC6H_SF16 DDS out.

pub mod bake;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod error;
pub mod formats;
pub mod gpu;
pub mod io;

pub use bake::{run, BakeSummary, BakedSet, Baker};
pub use cli::{Args, BakeConfig};
pub use error::{BakeError, BakeResult, ConfigError};
pub use gpu::GpuContext;
