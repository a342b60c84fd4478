//! Core GPU plumbing
//!
//! Kernel compilation, image allocation, single-dispatch execution and readback.

pub mod readback;
pub mod resources;

pub use resources::{
    aligned_uniform_size, GpuImage, Kernel, KernelSignature, KernelSource, ResourceManager,
    UniformBuffer, UNIFORM_ALIGNMENT,
};
