// src/core/resources.rs
// Owns the GPU device and exposes kernels, images, uniforms and single-dispatch execution
// Every bake and validation dispatch goes through run_kernel so bindings never outlive it
// RELEVANT FILES: src/gpu.rs, src/core/readback.rs, src/bake/accumulate.rs, src/shaders/common.wgsl

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use log::{debug, trace};

use crate::catalog::ImageExtent;
use crate::error::{BakeError, BakeResult};
use crate::gpu::GpuContext;
use crate::io::{tex_upload, HostImage};

/// Uniform buffers are sized in multiples of this many bytes.
pub const UNIFORM_ALIGNMENT: u64 = 64;

/// Round a uniform payload size up to the uniform buffer allocation granularity.
pub fn aligned_uniform_size(size: u64) -> u64 {
    let size = size.max(1);
    ((size + UNIFORM_ALIGNMENT - 1) / UNIFORM_ALIGNMENT) * UNIFORM_ALIGNMENT
}

/// WGSL text of one compute kernel plus the entry point to build.
#[derive(Clone, Debug)]
pub struct KernelSource {
    pub label: String,
    pub entry_point: &'static str,
    pub wgsl: Cow<'static, str>,
}

impl KernelSource {
    pub fn embedded(label: &str, entry_point: &'static str, wgsl: &'static str) -> Self {
        Self {
            label: label.to_string(),
            entry_point,
            wgsl: Cow::Borrowed(wgsl),
        }
    }

    /// Concatenate `files` from `dir` in order. A missing or unreadable file is a compile error.
    pub fn from_dir(
        label: &str,
        entry_point: &'static str,
        dir: &Path,
        files: &[&str],
    ) -> BakeResult<Self> {
        let mut wgsl = String::new();
        for file in files {
            let path = dir.join(file);
            let text = fs::read_to_string(&path).map_err(|e| {
                BakeError::compile(format!("cannot read kernel source {}: {e}", path.display()))
            })?;
            wgsl.push_str(&text);
            wgsl.push('\n');
        }
        Ok(Self {
            label: label.to_string(),
            entry_point,
            wgsl: Cow::Owned(wgsl),
        })
    }
}

/// Binding shape of a kernel.
///
/// Binding 0 is the uniform block. Bindings `1..=inputs` are sampled float
/// textures, followed by one storage texture per entry in `outputs`.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelSignature {
    pub inputs: usize,
    pub outputs: Vec<(wgpu::TextureFormat, wgpu::StorageTextureAccess)>,
}

impl KernelSignature {
    fn layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        let mut binding = 1;
        for _ in 0..self.inputs {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            binding += 1;
        }
        for (format, access) in &self.outputs {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: *access,
                    format: *format,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            });
            binding += 1;
        }
        entries
    }
}

/// A compiled compute pipeline and the layout its bindings must match.
pub struct Kernel {
    label: String,
    signature: KernelSignature,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// A 2D float image living on the device.
pub struct GpuImage {
    pub texture: wgpu::Texture,
    pub read_view: wgpu::TextureView,
    /// Present only for images allocated with storage access.
    pub write_view: Option<wgpu::TextureView>,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl GpuImage {
    fn bytes_per_pixel(&self) -> BakeResult<u32> {
        self.format
            .block_copy_size(None)
            .ok_or_else(|| BakeError::device(format!("{:?} has no copy size", self.format)))
    }
}

impl ImageExtent for GpuImage {
    fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

pub struct UniformBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

impl UniformBuffer {
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Bind group alive for exactly one dispatch; dropping it releases every binding.
struct BoundDispatch<'k> {
    kernel: &'k Kernel,
    bind_group: Option<wgpu::BindGroup>,
}

impl<'k> BoundDispatch<'k> {
    fn encode(&self, device: &wgpu::Device, groups: [u32; 3]) -> Option<wgpu::CommandBuffer> {
        let bind_group = self.bind_group.as_ref()?;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&self.kernel.label),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&self.kernel.label),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernel.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        Some(encoder.finish())
    }
}

impl Drop for BoundDispatch<'_> {
    fn drop(&mut self) {
        if self.bind_group.take().is_some() {
            trace!("released bindings of {}", self.kernel.label);
        }
    }
}

/// Device-facing half of the baker.
pub struct ResourceManager {
    gpu: GpuContext,
}

impl ResourceManager {
    pub fn new(gpu: GpuContext) -> Self {
        Self { gpu }
    }

    fn device(&self) -> &wgpu::Device {
        &self.gpu.device
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    ///
    /// Queue writes and submissions must also go through here; errors outside
    /// a scope only reach the uncaptured handler and the run would carry on.
    fn scoped<T>(&self, f: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
        self.device().push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device().push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device().pop_error_scope());
        let oom = pollster::block_on(self.device().pop_error_scope());
        match validation.or(oom) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    pub fn compile_kernel(
        &self,
        source: &KernelSource,
        signature: KernelSignature,
    ) -> BakeResult<Kernel> {
        let device = self.device();
        let (layout, pipeline) = self
            .scoped(|| {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&source.label),
                    source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
                });
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&source.label),
                    entries: &signature.layout_entries(),
                });
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some(&source.label),
                        bind_group_layouts: &[&layout],
                        push_constant_ranges: &[],
                    });
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&source.label),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: source.entry_point,
                });
                (layout, pipeline)
            })
            .map_err(|e| BakeError::compile(format!("{}: {e}", source.label)))?;
        debug!("Compiled kernel {}", source.label);
        Ok(Kernel {
            label: source.label.clone(),
            signature,
            layout,
            pipeline,
        })
    }

    /// Allocate an uninitialized image. `storage` adds a write view for kernel outputs.
    pub fn allocate_image(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        storage: bool,
    ) -> BakeResult<GpuImage> {
        if width == 0 || height == 0 {
            return Err(BakeError::device(format!("{label}: image extent must be positive")));
        }
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        if storage {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        let device = self.device();
        let image = self
            .scoped(|| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage,
                    view_formats: &[],
                });
                let read_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                let write_view = storage
                    .then(|| texture.create_view(&wgpu::TextureViewDescriptor::default()));
                GpuImage {
                    texture,
                    read_view,
                    write_view,
                    format,
                    width,
                    height,
                }
            })
            .map_err(|e| BakeError::device(format!("failed to allocate {label}: {e}")))?;
        Ok(image)
    }

    /// Upload a host scalar image into a read-only R32Float image.
    ///
    /// An image larger than the device allows is an asset error, so the
    /// caller can skip that one file.
    pub fn upload_scalar_image(&self, label: &str, host: &HostImage) -> BakeResult<GpuImage> {
        let max = self.device().limits().max_texture_dimension_2d;
        if host.width > max || host.height > max {
            return Err(BakeError::asset(format!(
                "{label}: {}x{} exceeds the device limit of {max} texels per side",
                host.width, host.height
            )));
        }
        let image = self.allocate_image(
            label,
            host.width,
            host.height,
            wgpu::TextureFormat::R32Float,
            false,
        )?;
        let queue = &self.gpu.queue;
        self.scoped(|| {
            tex_upload::upload_r32f_texture(
                queue,
                &image.texture,
                &host.data,
                host.width,
                host.height,
            )
        })
        .map_err(|e| BakeError::device(format!("failed to upload {label}: {e}")))??;
        Ok(image)
    }

    pub fn clear_image(&self, image: &GpuImage) -> BakeResult<()> {
        let bpp = image.bytes_per_pixel()?;
        let queue = &self.gpu.queue;
        self.scoped(|| {
            tex_upload::zero_texture(queue, &image.texture, bpp, image.width, image.height)
        })
        .map_err(|e| BakeError::device(format!("failed to clear {:?} image: {e}", image.format)))?
    }

    pub fn create_uniform_buffer(&self, label: &str, payload_size: u64) -> BakeResult<UniformBuffer> {
        let size = aligned_uniform_size(payload_size);
        let device = self.device();
        let buffer = self
            .scoped(|| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .map_err(|e| BakeError::device(format!("failed to create uniform buffer {label}: {e}")))?;
        Ok(UniformBuffer { buffer, size })
    }

    pub fn update_uniform_buffer(&self, uniform: &UniformBuffer, bytes: &[u8]) -> BakeResult<()> {
        if bytes.len() as u64 > uniform.size {
            return Err(BakeError::device(format!(
                "uniform payload of {} bytes exceeds buffer of {} bytes",
                bytes.len(),
                uniform.size
            )));
        }
        let queue = &self.gpu.queue;
        self.scoped(|| queue.write_buffer(&uniform.buffer, 0, bytes))
            .map_err(|e| BakeError::device(format!("uniform update failed: {e}")))
    }

    fn bind<'k>(
        &self,
        kernel: &'k Kernel,
        inputs: &[&GpuImage],
        outputs: &[&GpuImage],
        uniform: &UniformBuffer,
    ) -> BakeResult<BoundDispatch<'k>> {
        let signature = &kernel.signature;
        if inputs.len() != signature.inputs || outputs.len() != signature.outputs.len() {
            return Err(BakeError::device(format!(
                "{} expects {} inputs and {} outputs, got {} and {}",
                kernel.label,
                signature.inputs,
                signature.outputs.len(),
                inputs.len(),
                outputs.len()
            )));
        }

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.buffer.as_entire_binding(),
        }];
        let mut binding = 1;
        for image in inputs {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&image.read_view),
            });
            binding += 1;
        }
        for (image, (format, _)) in outputs.iter().zip(&signature.outputs) {
            let view = image.write_view.as_ref().ok_or_else(|| {
                BakeError::device(format!("{}: output image has no storage view", kernel.label))
            })?;
            if image.format != *format {
                return Err(BakeError::device(format!(
                    "{}: output image is {:?}, kernel writes {:?}",
                    kernel.label, image.format, format
                )));
            }
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
            binding += 1;
        }

        let device = self.device();
        let bind_group = self
            .scoped(|| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&kernel.label),
                    layout: &kernel.layout,
                    entries: &entries,
                })
            })
            .map_err(|e| BakeError::device(format!("{}: binding failed: {e}", kernel.label)))?;
        Ok(BoundDispatch {
            kernel,
            bind_group: Some(bind_group),
        })
    }

    /// Bind `inputs`/`outputs`, submit exactly one dispatch of `groups`, then release the bindings.
    pub fn run_kernel(
        &self,
        kernel: &Kernel,
        inputs: &[&GpuImage],
        outputs: &[&GpuImage],
        uniform: &UniformBuffer,
        groups: [u32; 3],
    ) -> BakeResult<()> {
        let bound = self.bind(kernel, inputs, outputs, uniform)?;
        let device = self.device();
        let queue = &self.gpu.queue;
        self.scoped(|| {
            let commands = bound.encode(device, groups)?;
            queue.submit(std::iter::once(commands));
            Some(())
        })
        .map_err(|e| BakeError::device(format!("{}: dispatch failed: {e}", kernel.label)))?
        .ok_or_else(|| BakeError::device(format!("{}: bindings released early", kernel.label)))
    }

    /// Read every channel of `image` back to the host, after all submitted work.
    pub fn capture_image(&self, image: &GpuImage) -> BakeResult<Vec<f32>> {
        super::readback::read_texture_f32(&self.gpu.device, &self.gpu.queue, &image.texture)
            .map_err(|e| BakeError::capture(format!("{:?} image: {e:#}", image.format)))
    }
}
