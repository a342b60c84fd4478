// src/gpu.rs
// Headless wgpu device bootstrap for the baker
// RELEVANT FILES: src/core/resources.rs, src/core/readback.rs, src/bake/pipeline.rs

use log::{error, info};

use crate::error::{BakeError, BakeResult};

/// Format of the SH accumulators. Kernels read them sampled and write them write-only.
pub const ACCUMULATOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter: wgpu::Adapter,
}

impl GpuContext {
    pub fn new() -> BakeResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| BakeError::init("No suitable GPU adapter"))?;

        let info = adapter.get_info();
        info!("Using adapter {} ({:?})", info.name, info.backend);

        let format_features = adapter.get_texture_format_features(ACCUMULATOR_FORMAT);
        if !format_features
            .allowed_usages
            .contains(wgpu::TextureUsages::STORAGE_BINDING)
        {
            return Err(BakeError::init(format!(
                "adapter cannot bind {:?} as a storage texture",
                ACCUMULATOR_FORMAT
            )));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                label: Some("cloud-bakery-device"),
            },
            None,
        ))
        .map_err(|e| BakeError::init(format!("request_device failed: {e}")))?;

        device.on_uncaptured_error(Box::new(|err| {
            error!("Uncaptured wgpu error: {err}");
        }));

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }
}

/// Align to WebGPU's required bytes-per-row for copies.
#[inline]
pub fn align_copy_bpr(unpadded: u32) -> u32 {
    let a = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    ((unpadded + a - 1) / a) * a
}

/// Number of 8x8 workgroups covering a `width` x `height` texel grid.
#[inline]
pub fn dispatch_groups(width: u32, height: u32) -> [u32; 3] {
    const TILE: u32 = 8;
    [(width + TILE - 1) / TILE, (height + TILE - 1) / TILE, 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_row_rounds_up_to_copy_alignment() {
        assert_eq!(align_copy_bpr(1), 256);
        assert_eq!(align_copy_bpr(256), 256);
        assert_eq!(align_copy_bpr(257), 512);
        assert_eq!(align_copy_bpr(64 * 16), 1024);
    }

    #[test]
    fn dispatch_covers_partial_tiles() {
        assert_eq!(dispatch_groups(64, 64), [8, 8, 1]);
        assert_eq!(dispatch_groups(65, 1), [9, 1, 1]);
        assert_eq!(dispatch_groups(1, 7), [1, 1, 1]);
    }
}
