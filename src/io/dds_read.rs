//! DDS (.dds) input loader
//!
//! Decodes the first mip of a 2D DDS image into a single-channel f32 buffer.
//! Channel 0 (R or L) carries the scalar radiance/transmittance value.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ddsfile::{Caps2, D3D10ResourceDimension, D3DFormat, Dds, DxgiFormat, MiscFlag};
use half::f16;

use crate::catalog::ImageExtent;
use crate::error::{BakeError, BakeResult};

/// Host-side scalar image
#[derive(Debug, Clone, PartialEq)]
pub struct HostImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// One f32 per pixel, row-major
    pub data: Vec<f32>,
}

impl HostImage {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl ImageExtent for HostImage {
    fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelKind {
    F32,
    F16,
    Unorm8,
}

impl ChannelKind {
    fn size(self) -> usize {
        match self {
            ChannelKind::F32 => 4,
            ChannelKind::F16 => 2,
            ChannelKind::Unorm8 => 1,
        }
    }

    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            ChannelKind::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            ChannelKind::F16 => f16::from_le_bytes([bytes[0], bytes[1]]).to_f32(),
            ChannelKind::Unorm8 => bytes[0] as f32 / 255.0,
        }
    }
}

/// Per-pixel layout of the supported uncompressed formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelLayout {
    kind: ChannelKind,
    channels: usize,
}

impl PixelLayout {
    const fn new(kind: ChannelKind, channels: usize) -> Self {
        Self { kind, channels }
    }

    fn bytes_per_pixel(self) -> usize {
        self.kind.size() * self.channels
    }
}

fn pixel_layout(dds: &Dds) -> Option<PixelLayout> {
    use ChannelKind::*;
    if let Some(format) = dds.get_dxgi_format() {
        return match format {
            DxgiFormat::R32G32B32A32_Float => Some(PixelLayout::new(F32, 4)),
            DxgiFormat::R32G32B32_Float => Some(PixelLayout::new(F32, 3)),
            DxgiFormat::R32G32_Float => Some(PixelLayout::new(F32, 2)),
            DxgiFormat::R32_Float => Some(PixelLayout::new(F32, 1)),
            DxgiFormat::R16G16B16A16_Float => Some(PixelLayout::new(F16, 4)),
            DxgiFormat::R16G16_Float => Some(PixelLayout::new(F16, 2)),
            DxgiFormat::R16_Float => Some(PixelLayout::new(F16, 1)),
            DxgiFormat::R8G8B8A8_UNorm => Some(PixelLayout::new(Unorm8, 4)),
            DxgiFormat::R8_UNorm => Some(PixelLayout::new(Unorm8, 1)),
            _ => None,
        };
    }
    match dds.get_d3d_format()? {
        D3DFormat::A32B32G32R32F => Some(PixelLayout::new(F32, 4)),
        D3DFormat::G32R32F => Some(PixelLayout::new(F32, 2)),
        D3DFormat::R32F => Some(PixelLayout::new(F32, 1)),
        D3DFormat::A16B16G16R16F => Some(PixelLayout::new(F16, 4)),
        D3DFormat::G16R16F => Some(PixelLayout::new(F16, 2)),
        D3DFormat::R16F => Some(PixelLayout::new(F16, 1)),
        D3DFormat::L8 => Some(PixelLayout::new(Unorm8, 1)),
        _ => None,
    }
}

fn is_two_dimensional(dds: &Dds) -> bool {
    if dds.get_depth() > 1 || dds.get_num_array_layers() > 1 {
        return false;
    }
    if dds.header.caps2.intersects(Caps2::CUBEMAP | Caps2::VOLUME) {
        return false;
    }
    match &dds.header10 {
        Some(h10) => {
            matches!(h10.resource_dimension, D3D10ResourceDimension::Texture2D)
                && !h10.misc_flag.contains(MiscFlag::TEXTURECUBE)
        }
        None => true,
    }
}

/// Decode an already parsed DDS into a scalar host image.
pub fn decode_dds(dds: &Dds) -> BakeResult<HostImage> {
    if !is_two_dimensional(dds) {
        return Err(BakeError::asset("is not a 2d texture"));
    }
    let layout = pixel_layout(dds).ok_or_else(|| {
        BakeError::asset(format!(
            "unsupported pixel format (dxgi={:?}, d3d={:?})",
            dds.get_dxgi_format(),
            dds.get_d3d_format()
        ))
    })?;

    let width = dds.get_width();
    let height = dds.get_height();
    if width == 0 || height == 0 {
        return Err(BakeError::asset("image has zero extent"));
    }
    let pixel_count = (width as usize) * (height as usize);
    let bpp = layout.bytes_per_pixel();

    let bytes = dds
        .get_data(0)
        .map_err(|e| BakeError::asset(format!("missing pixel data: {e}")))?;
    if bytes.len() < pixel_count * bpp {
        return Err(BakeError::asset(format!(
            "truncated pixel data: expected {} bytes, got {}",
            pixel_count * bpp,
            bytes.len()
        )));
    }

    let data = bytes
        .chunks_exact(bpp)
        .take(pixel_count)
        .map(|px| layout.kind.read(px))
        .collect();
    Ok(HostImage::new(width, height, data))
}

/// Load a DDS file from disk. Every failure is a recoverable asset error.
pub fn load_dds<P: AsRef<Path>>(path: P) -> BakeResult<HostImage> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| BakeError::asset(format!("{}: {e}", path.display())))?;
    let dds = Dds::read(BufReader::new(file))
        .map_err(|e| BakeError::asset(format!("{}: {e}", path.display())))?;
    decode_dds(&dds).map_err(|e| match e {
        BakeError::Asset(msg) => BakeError::asset(format!("{}: {msg}", path.display())),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dds_write::write_dds_r32f;

    fn dxgi(format: DxgiFormat, width: u32, height: u32, data: Vec<u8>) -> Dds {
        let mut dds = Dds::new_dxgi(ddsfile::NewDxgiParams {
            height,
            width,
            depth: None,
            format,
            mipmap_levels: None,
            array_layers: None,
            caps2: None,
            is_cubemap: false,
            resource_dimension: D3D10ResourceDimension::Texture2D,
            alpha_mode: ddsfile::AlphaMode::Unknown,
        })
        .unwrap();
        dds.data = data;
        dds
    }

    #[test]
    fn decodes_first_channel_of_rgba32f() {
        let texels: Vec<f32> = vec![1.0, 9.0, 9.0, 9.0, -2.5, 9.0, 9.0, 9.0];
        let dds = dxgi(
            DxgiFormat::R32G32B32A32_Float,
            2,
            1,
            bytemuck::cast_slice(&texels).to_vec(),
        );
        let image = decode_dds(&dds).unwrap();
        assert_eq!(image.data, vec![1.0, -2.5]);
    }

    #[test]
    fn decodes_half_and_unorm() {
        let halves: Vec<u16> = [0.5f32, 2.0]
            .iter()
            .map(|v| f16::from_f32(*v).to_bits())
            .collect();
        let dds = dxgi(DxgiFormat::R16_Float, 2, 1, bytemuck::cast_slice(&halves).to_vec());
        assert_eq!(decode_dds(&dds).unwrap().data, vec![0.5, 2.0]);

        let dds = dxgi(DxgiFormat::R8_UNorm, 2, 1, vec![0, 255]);
        assert_eq!(decode_dds(&dds).unwrap().data, vec![0.0, 1.0]);
    }

    #[test]
    fn rejects_array_and_compressed_inputs() {
        let mut dds = Dds::new_dxgi(ddsfile::NewDxgiParams {
            height: 4,
            width: 4,
            depth: None,
            format: DxgiFormat::R32_Float,
            mipmap_levels: None,
            array_layers: Some(2),
            caps2: None,
            is_cubemap: false,
            resource_dimension: D3D10ResourceDimension::Texture2D,
            alpha_mode: ddsfile::AlphaMode::Unknown,
        })
        .unwrap();
        dds.data = vec![0; 4 * 4 * 4 * 2];
        let err = decode_dds(&dds).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("not a 2d texture"));

        let dds = dxgi(DxgiFormat::BC7_UNorm, 4, 4, vec![0; 16]);
        assert!(decode_dds(&dds).unwrap_err().to_string().contains("unsupported"));
    }

    #[test]
    fn load_reads_what_the_writer_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t_+x_tr.dds");
        let values = vec![0.25, 0.5, 0.75, 1.0, 0.0, -1.0];
        write_dds_r32f(&path, &values, 3, 2).unwrap();

        let image = load_dds(&path).unwrap();
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.data, values);
    }

    #[test]
    fn garbage_file_is_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk_+x_tr.dds");
        std::fs::write(&path, b"definitely not a dds").unwrap();
        let err = load_dds(&path).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("junk_+x_tr.dds"));
    }
}
