//! Texture upload with row-pitch alignment for WebGPU/WGSL
//!
//! Rows are padded to COPY_BYTES_PER_ROW_ALIGNMENT (256 bytes) before upload.

use wgpu::{Extent3d, ImageDataLayout, Queue, Texture};

use crate::error::{BakeError, BakeResult};
use crate::gpu::align_copy_bpr;

/// Copy tight rows into a buffer whose rows start every `pitch` bytes.
fn pad_rows(data: &[u8], row_bytes: usize, pitch: usize) -> Vec<u8> {
    if row_bytes == 0 || pitch == row_bytes {
        return data.to_vec();
    }
    let mut staged = Vec::with_capacity(pitch * (data.len() / row_bytes));
    for row in data.chunks_exact(row_bytes) {
        staged.extend_from_slice(row);
        staged.resize(staged.len() + pitch - row_bytes, 0);
    }
    staged
}

/// Upload tightly packed rows of `bytes_per_pixel` texels into mip 0 of `texture`.
pub fn upload_texture_bytes(
    queue: &Queue,
    texture: &Texture,
    data: &[u8],
    bytes_per_pixel: u32,
    width: u32,
    height: u32,
) -> BakeResult<()> {
    let row_bytes = (width * bytes_per_pixel) as usize;
    if data.len() != row_bytes * height as usize {
        return Err(BakeError::device(format!(
            "upload of {width}x{height} texels at {bytes_per_pixel} bytes each got {} bytes",
            data.len()
        )));
    }

    let pitch = align_copy_bpr(row_bytes as u32);
    let staged = pad_rows(data, row_bytes, pitch as usize);
    queue.write_texture(
        texture.as_image_copy(),
        &staged,
        ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(pitch),
            rows_per_image: Some(height),
        },
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    Ok(())
}

/// Upload R32Float texture data
pub fn upload_r32f_texture(
    queue: &Queue,
    texture: &Texture,
    data: &[f32],
    width: u32,
    height: u32,
) -> BakeResult<()> {
    upload_texture_bytes(queue, texture, bytemuck::cast_slice(data), 4, width, height)
}

/// Overwrite mip 0 of `texture` with zeros.
pub fn zero_texture(
    queue: &Queue,
    texture: &Texture,
    bytes_per_pixel: u32,
    width: u32,
    height: u32,
) -> BakeResult<()> {
    let zeros = vec![0u8; (width * height * bytes_per_pixel) as usize];
    upload_texture_bytes(queue, texture, &zeros, bytes_per_pixel, width, height)
}
