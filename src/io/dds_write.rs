//! DDS encoding utilities for baked output.
//!
//! Centralizes buffer validation for the accumulator and validation write paths.

use anyhow::{ensure, Context, Result};
use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, DxgiFormat, NewDxgiParams};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::formats::bc6h;

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow::anyhow!("image dimensions overflow"))
}

fn new_texture2d(width: u32, height: u32, format: DxgiFormat) -> Result<Dds> {
    Dds::new_dxgi(NewDxgiParams {
        height,
        width,
        depth: None,
        format,
        mipmap_levels: None,
        array_layers: None,
        caps2: None,
        is_cubemap: false,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Unknown,
    })
    .with_context(|| format!("failed to build {:?} DDS header", format))
}

fn persist(path: &Path, dds: &Dds) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output DDS at {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    dds.write(&mut writer)
        .with_context(|| format!("failed to encode DDS {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush DDS {}", path.display()))?;
    Ok(())
}

/// Compress the RGB channels of a tight RGBA32F buffer to BC6H_SF16 and write it.
pub fn write_dds_bc6h_sf16(path: &Path, data: &[f32], width: u32, height: u32) -> Result<()> {
    ensure!(width > 0 && height > 0, "DDS dimensions must be positive");
    let expected = pixel_count(width, height)? * 4;
    ensure!(
        data.len() == expected,
        "BC6H writer requires tight RGBA32F buffer: expected {} floats, got {}",
        expected,
        data.len()
    );

    let mut dds = new_texture2d(width, height, DxgiFormat::BC6H_SF16)?;
    let blocks = bc6h::compress_rgba_f32(data, width, height);
    ensure!(
        blocks.len() == dds.data.len(),
        "BC6H payload is {} bytes, container expects {}",
        blocks.len(),
        dds.data.len()
    );
    dds.data = blocks;
    persist(path, &dds)
}

/// Write a tight scalar buffer as an uncompressed R32_Float DDS.
pub fn write_dds_r32f(path: &Path, data: &[f32], width: u32, height: u32) -> Result<()> {
    ensure!(width > 0 && height > 0, "DDS dimensions must be positive");
    let expected = pixel_count(width, height)?;
    ensure!(
        data.len() == expected,
        "R32F writer requires tight scalar buffer: expected {} floats, got {}",
        expected,
        data.len()
    );

    let mut dds = new_texture2d(width, height, DxgiFormat::R32_Float)?;
    dds.data = bytemuck::cast_slice(data).to_vec();
    persist(path, &dds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn bc6h_output_has_signed_format_and_block_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c_+z_sh0.dds");
        let (w, h) = (6, 5);
        let rgba: Vec<f32> = (0..w * h * 4).map(|i| (i as f32 * 0.37).sin()).collect();
        write_dds_bc6h_sf16(&path, &rgba, w, h).unwrap();

        let dds = Dds::read(BufReader::new(File::open(&path).unwrap())).unwrap();
        assert!(matches!(dds.get_dxgi_format(), Some(DxgiFormat::BC6H_SF16)));
        assert_eq!((dds.get_width(), dds.get_height()), (6, 5));
        // 2x2 blocks of 16 bytes
        assert_eq!(dds.get_data(0).unwrap().len(), 4 * 16);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dds");
        assert!(write_dds_r32f(&path, &[1.0; 3], 2, 2).is_err());
        assert!(write_dds_bc6h_sf16(&path, &[1.0; 4], 2, 2).is_err());
        assert!(write_dds_r32f(&path, &[], 0, 2).is_err());
    }

    #[test]
    fn unwritable_path_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.dds");
        let err = write_dds_r32f(&path, &[1.0], 1, 1).unwrap_err();
        assert!(format!("{err:#}").contains("missing"));
    }
}
