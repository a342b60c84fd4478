// src/bake/params.rs
// Uniform block shared by the bake and validation kernels
// RELEVANT FILES: src/shaders/common.wgsl, src/bake/accumulate.rs

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::catalog::Face;
use crate::core::aligned_uniform_size;

/// Mirrors `BakeParams` in common.wgsl: vec3 + f32, u32 + 3 pad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BakeParams {
    pub light_dir: [f32; 3],
    pub weight: f32,
    pub face: u32,
    pub pad: [f32; 3],
}

impl BakeParams {
    pub fn new(light_dir: Vec3, weight: f32, face: Face) -> Self {
        Self {
            light_dir: light_dir.to_array(),
            weight,
            face: face.index(),
            pad: [0.0; 3],
        }
    }

    /// Bytes reserved for the uniform buffer holding these params.
    pub fn buffer_size() -> u64 {
        aligned_uniform_size(std::mem::size_of::<Self>() as u64)
    }
}
