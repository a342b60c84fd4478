// src/core/readback.rs
// Blocking download of float storage images into tight host buffers
// RELEVANT FILES: src/core/resources.rs, src/io/dds_write.rs, src/gpu.rs

use anyhow::{anyhow, ensure, Context, Result};
use futures_intrusive::channel::shared::oneshot_channel;

use crate::gpu::align_copy_bpr;

/// Row geometry of a mip-0 texture-to-buffer copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyLayout {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub tight_row: u32,
    pub padded_row: u32,
}

impl CopyLayout {
    /// Layout for the 32-bit float formats the baker produces.
    pub fn for_format(format: wgpu::TextureFormat, width: u32, height: u32) -> Result<Self> {
        ensure!(width > 0 && height > 0, "readback extent must be positive");
        let channels = match format {
            wgpu::TextureFormat::R32Float => 1,
            wgpu::TextureFormat::Rgba32Float => 4,
            other => return Err(anyhow!("no float readback for {:?}", other)),
        };
        let tight_row = width
            .checked_mul(channels * 4)
            .context("readback row size overflows u32")?;
        Ok(Self {
            width,
            height,
            channels,
            tight_row,
            padded_row: align_copy_bpr(tight_row),
        })
    }

    pub fn buffer_size(&self) -> wgpu::BufferAddress {
        self.padded_row as wgpu::BufferAddress * self.height as wgpu::BufferAddress
    }

    /// Drop the per-row padding of a mapped staging buffer.
    pub fn depad_f32(&self, padded: &[u8]) -> Vec<f32> {
        let tight_row = self.tight_row as usize;
        let mut out = Vec::with_capacity((self.width * self.height * self.channels) as usize);
        for row in padded
            .chunks(self.padded_row as usize)
            .take(self.height as usize)
        {
            out.extend(
                row[..tight_row]
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
        }
        out
    }

    fn image_layout(&self) -> wgpu::ImageDataLayout {
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(self.padded_row),
            rows_per_image: Some(self.height),
        }
    }
}

fn map_for_reading(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<()> {
    let (tx, rx) = oneshot_channel();
    buffer.slice(..).map_async(wgpu::MapMode::Read, move |status| {
        let _ = tx.send(status);
    });
    device.poll(wgpu::Maintain::Wait);
    pollster::block_on(rx.receive())
        .ok_or_else(|| anyhow!("staging map callback never fired"))?
        .map_err(|e| anyhow!("staging map failed: {e}"))
}

/// Copy mip 0 of `src` to the host as tightly packed f32 channels.
///
/// The copy is queued behind every earlier submission, so the result
/// reflects all dispatches issued before the call.
pub fn read_texture_f32(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Texture,
) -> Result<Vec<f32>> {
    ensure!(src.sample_count() == 1, "cannot read back a multisampled image");
    let layout = CopyLayout::for_format(src.format(), src.width(), src.height())?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("cloud-bakery-capture"),
        size: layout.buffer_size(),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("cloud-bakery-capture"),
    });
    encoder.copy_texture_to_buffer(
        src.as_image_copy(),
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: layout.image_layout(),
        },
        src.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("capture copy failed: {err}"));
    }

    map_for_reading(device, &staging)?;
    let texels = layout.depad_f32(&staging.slice(..).get_mapped_range());
    staging.unmap();
    Ok(texels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        let layout = CopyLayout::for_format(wgpu::TextureFormat::Rgba32Float, 5, 3).unwrap();
        assert_eq!(layout.tight_row, 80);
        assert_eq!(layout.padded_row, 256);
        assert_eq!(layout.buffer_size(), 768);
        assert!(CopyLayout::for_format(wgpu::TextureFormat::Rgba8Unorm, 5, 3).is_err());
        assert!(CopyLayout::for_format(wgpu::TextureFormat::R32Float, 0, 3).is_err());
    }

    #[test]
    fn depad_keeps_only_image_bytes() {
        let layout = CopyLayout::for_format(wgpu::TextureFormat::R32Float, 2, 2).unwrap();
        let mut padded = vec![0xFFu8; layout.buffer_size() as usize];
        for (row, values) in [[1.0f32, 2.0], [3.0, 4.0]].iter().enumerate() {
            let start = row * layout.padded_row as usize;
            padded[start..start + 8].copy_from_slice(bytemuck::cast_slice(values));
        }
        assert_eq!(layout.depad_f32(&padded), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
