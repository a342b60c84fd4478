// src/bake/validate.rs
// Optional reconstruction of the last sample's radiance from the baked coefficients
// RELEVANT FILES: src/shaders/validation.wgsl, src/bake/accumulate.rs, src/io/dds_write.rs

use std::path::PathBuf;

use log::info;

use super::accumulate::AccumulationContext;
use super::kernels::VALIDATION_FORMAT;
use crate::catalog::filename::validation_output_name;
use crate::catalog::InputImage;
use crate::core::{GpuImage, Kernel, ResourceManager};
use crate::error::{BakeError, BakeResult};
use crate::gpu::dispatch_groups;
use crate::io::write_dds_r32f;

/// Root-mean-square difference of two equally sized buffers.
pub fn rms_error(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum();
    Some((sum / a.len() as f64).sqrt() as f32)
}

pub struct ValidationReconstructor {
    output_dir: PathBuf,
}

impl ValidationReconstructor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Reconstruct radiance for the context's last light direction and write
    /// `{key}_{lx:.2}_{ly:.2}_{lz:.2}_re.dds`.
    ///
    /// `reference` is the input sample for that direction; when given, the
    /// RMS difference to it is logged.
    pub fn reconstruct(
        &self,
        resources: &ResourceManager,
        kernel: &Kernel,
        context: &AccumulationContext<'_>,
        transmittance: &GpuImage,
        reference: Option<&InputImage<GpuImage>>,
    ) -> BakeResult<PathBuf> {
        let light_dir = context.last_light_dir().ok_or_else(|| {
            BakeError::device(format!("{}: nothing was accumulated", context.key()))
        })?;
        let plan = context.plan();
        let output = resources.allocate_image(
            &format!("{}-validation", context.key()),
            plan.width,
            plan.height,
            VALIDATION_FORMAT,
            true,
        )?;
        context.write_params(light_dir)?;

        let [sh0, sh1, sh2] = context.accumulators();
        resources.run_kernel(
            kernel,
            &[sh0, sh1, sh2, transmittance],
            &[&output],
            context.uniform(),
            dispatch_groups(plan.width, plan.height),
        )?;

        let path = self
            .output_dir
            .join(validation_output_name(context.key(), light_dir));
        let texels = resources.capture_image(&output)?;
        write_dds_r32f(&path, &texels, plan.width, plan.height)
            .map_err(|e| BakeError::persist(format!("{e:#}")))?;
        info!("\tWrote {}", path.display());

        if let Some(sample) = reference {
            let original = resources.capture_image(&sample.handle)?;
            if let Some(rms) = rms_error(&texels, &original) {
                info!("\tReconstruction RMS error vs {}: {:.6}", sample.file_name, rms);
            }
        }
        Ok(path)
    }
}
