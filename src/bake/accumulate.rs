// src/bake/accumulate.rs
// Per-set accumulation state: three zeroed SH accumulators, the uniform block and sample dispatch
// Each dispatch reads the running sums and stores the updated ones into a second image set, then the two swap
// A context lives for exactly one texture set and releases its GPU memory when dropped
// RELEVANT FILES: src/shaders/bake.wgsl, src/bake/params.rs, src/core/resources.rs, src/bake/pipeline.rs

use glam::Vec3;
use log::debug;

use super::params::BakeParams;
use super::sh::ACCUMULATOR_COUNT;
use crate::catalog::{Face, InputImage, SetPlan};
use crate::core::{GpuImage, Kernel, ResourceManager, UniformBuffer};
use crate::error::{BakeError, BakeResult};
use crate::gpu::{dispatch_groups, ACCUMULATOR_FORMAT};

pub struct AccumulationContext<'r> {
    resources: &'r ResourceManager,
    key: String,
    face: Face,
    plan: SetPlan,
    accumulators: [GpuImage; ACCUMULATOR_COUNT],
    scratch: [GpuImage; ACCUMULATOR_COUNT],
    uniform: UniformBuffer,
    last_light_dir: Option<Vec3>,
    samples: usize,
}

impl<'r> AccumulationContext<'r> {
    /// Allocate and zero the accumulators for a set of `plan` dimensions.
    pub fn new(
        resources: &'r ResourceManager,
        key: &str,
        face: Face,
        plan: SetPlan,
    ) -> BakeResult<Self> {
        let allocate = |i: usize, suffix: &str| {
            resources.allocate_image(
                &format!("{key}-sh{i}{suffix}"),
                plan.width,
                plan.height,
                ACCUMULATOR_FORMAT,
                true,
            )
        };
        let accumulators = [allocate(0, "")?, allocate(1, "")?, allocate(2, "")?];
        let scratch = [
            allocate(0, "-next")?,
            allocate(1, "-next")?,
            allocate(2, "-next")?,
        ];
        for image in &accumulators {
            resources.clear_image(image)?;
        }
        let uniform =
            resources.create_uniform_buffer(&format!("{key}-params"), BakeParams::buffer_size())?;
        Ok(Self {
            resources,
            key: key.to_string(),
            face,
            plan,
            accumulators,
            scratch,
            uniform,
            last_light_dir: None,
            samples: 0,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn plan(&self) -> SetPlan {
        self.plan
    }

    pub fn accumulators(&self) -> &[GpuImage; ACCUMULATOR_COUNT] {
        &self.accumulators
    }

    pub fn uniform(&self) -> &UniformBuffer {
        &self.uniform
    }

    /// Direction of the most recently accumulated sample.
    pub fn last_light_dir(&self) -> Option<Vec3> {
        self.last_light_dir
    }

    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// Write the uniform block for `light_dir` with this set's face and weight.
    pub fn write_params(&self, light_dir: Vec3) -> BakeResult<()> {
        let params = BakeParams::new(light_dir, self.plan.weight, self.face);
        self.resources
            .update_uniform_buffer(&self.uniform, bytemuck::bytes_of(&params))
    }

    /// Add one radiance sample into the accumulators with a single dispatch.
    pub fn accumulate(
        &mut self,
        kernel: &Kernel,
        sample: &InputImage<GpuImage>,
        transmittance: &GpuImage,
    ) -> BakeResult<()> {
        let light_dir = sample.light_dir().ok_or_else(|| {
            BakeError::device(format!("{} is not a radiance sample", sample.file_name))
        })?;
        self.write_params(light_dir)?;

        let [sh0, sh1, sh2] = &self.accumulators;
        let [next0, next1, next2] = &self.scratch;
        self.resources.run_kernel(
            kernel,
            &[&sample.handle, transmittance, sh0, sh1, sh2],
            &[next0, next1, next2],
            &self.uniform,
            dispatch_groups(self.plan.width, self.plan.height),
        )?;
        std::mem::swap(&mut self.accumulators, &mut self.scratch);
        debug!(
            "\tAccumulated {} (light {:.3} {:.3} {:.3})",
            sample.file_name, light_dir.x, light_dir.y, light_dir.z
        );
        self.last_light_dir = Some(light_dir);
        self.samples += 1;
        Ok(())
    }
}
