// src/bake/kernels.rs
// Kernel sources (embedded or from an override directory) and their binding signatures
// RELEVANT FILES: src/shaders/common.wgsl, src/shaders/bake.wgsl, src/shaders/validation.wgsl, src/core/resources.rs

use std::path::Path;

use crate::core::{Kernel, KernelSignature, KernelSource, ResourceManager};
use crate::error::BakeResult;
use crate::gpu::ACCUMULATOR_FORMAT;

use super::sh::ACCUMULATOR_COUNT;

pub const COMMON_FILE: &str = "common.wgsl";
pub const BAKE_FILE: &str = "bake.wgsl";
pub const VALIDATION_FILE: &str = "validation.wgsl";

/// Storage format of the validation reconstruction.
pub const VALIDATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

const BAKE_WGSL: &str = concat!(
    include_str!("../shaders/common.wgsl"),
    include_str!("../shaders/bake.wgsl")
);
const VALIDATION_WGSL: &str = concat!(
    include_str!("../shaders/common.wgsl"),
    include_str!("../shaders/validation.wgsl")
);

/// radiance + transmittance + current sums in, updated sums out.
pub fn bake_signature() -> KernelSignature {
    KernelSignature {
        inputs: 2 + ACCUMULATOR_COUNT,
        outputs: vec![(ACCUMULATOR_FORMAT, wgpu::StorageTextureAccess::WriteOnly); ACCUMULATOR_COUNT],
    }
}

/// three accumulators + transmittance in, one scalar image out.
pub fn validation_signature() -> KernelSignature {
    KernelSignature {
        inputs: ACCUMULATOR_COUNT + 1,
        outputs: vec![(VALIDATION_FORMAT, wgpu::StorageTextureAccess::WriteOnly)],
    }
}

pub fn bake_source(kernel_dir: Option<&Path>) -> BakeResult<KernelSource> {
    match kernel_dir {
        Some(dir) => KernelSource::from_dir("sh-bake", "cs_bake", dir, &[COMMON_FILE, BAKE_FILE]),
        None => Ok(KernelSource::embedded("sh-bake", "cs_bake", BAKE_WGSL)),
    }
}

pub fn validation_source(kernel_dir: Option<&Path>) -> BakeResult<KernelSource> {
    match kernel_dir {
        Some(dir) => KernelSource::from_dir(
            "sh-validation",
            "cs_validate",
            dir,
            &[COMMON_FILE, VALIDATION_FILE],
        ),
        None => Ok(KernelSource::embedded(
            "sh-validation",
            "cs_validate",
            VALIDATION_WGSL,
        )),
    }
}

/// Both kernels, compiled once per run.
pub struct BakeKernels {
    pub bake: Kernel,
    pub validation: Kernel,
}

impl BakeKernels {
    pub fn compile(resources: &ResourceManager, kernel_dir: Option<&Path>) -> BakeResult<Self> {
        let bake = resources.compile_kernel(&bake_source(kernel_dir)?, bake_signature())?;
        let validation =
            resources.compile_kernel(&validation_source(kernel_dir)?, validation_signature())?;
        Ok(Self { bake, validation })
    }
}
