// src/bake/sh.rs
// Host-side reference of the kernel math: face mapping, droplet phase and L2 SH projection
// Keep in step with src/shaders/common.wgsl
// RELEVANT FILES: src/shaders/common.wgsl, src/shaders/bake.wgsl, tests/sh_reference.rs

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::catalog::Face;

pub const SH_COEFFICIENTS: usize = 9;
/// Coefficients are packed three per accumulator image.
pub const ACCUMULATOR_COUNT: usize = 3;

const FOUR_PI: f32 = 4.0 * PI;
const INV_FOUR_PI: f32 = 1.0 / FOUR_PI;
const DROPLET_DIAMETER: f32 = 20.0;

/// Unit view direction of the texel at `uv` on `face`.
pub fn face_view_dir(face: Face, uv: Vec2) -> Vec3 {
    let w = Vec2::new(
        ((uv.x - 0.5) * 0.5 * PI).tan() * 0.5,
        ((uv.y - 0.5) * 0.5 * PI).tan() * 0.5,
    );
    let dir = match face {
        Face::PosX => Vec3::new(0.5, -w.x, -w.y),
        Face::NegX => Vec3::new(-0.5, w.x, -w.y),
        Face::PosY => Vec3::new(w.x, 0.5, -w.y),
        Face::NegY => Vec3::new(-w.x, -0.5, -w.y),
        Face::PosZ => Vec3::new(-w.x, -w.y, 0.5),
    };
    dir.normalize()
}

/// Centre of texel `(x, y)` in a `width` x `height` image.
pub fn texel_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

fn henyey_greenstein(cos_theta: f32, g: f32) -> f32 {
    let g2 = g * g;
    INV_FOUR_PI * (1.0 - g2) / (1.0 + g2 - 2.0 * g * cos_theta).powf(1.5)
}

fn draine(cos_theta: f32, g: f32, alpha: f32) -> f32 {
    let g2 = g * g;
    let hg = (1.0 - g2) / (1.0 + g2 - 2.0 * g * cos_theta).powf(1.5);
    let shape =
        (1.0 + alpha * cos_theta * cos_theta) / (1.0 + alpha * (1.0 + 2.0 * g2) / 3.0);
    INV_FOUR_PI * hg * shape
}

/// Single-scattering lobe of a 20 micrometre water droplet.
pub fn droplet_phase(cos_theta: f32) -> f32 {
    let d = DROPLET_DIAMETER;
    let g_hg = (-0.0990567 / (d - 1.67154)).exp();
    let g_d = (-2.20679 / (d + 3.91029) - 0.428934).exp();
    let alpha = (3.62489 - 8.29288 / (d + 5.52825)).exp();
    let w_d = (-0.599085 / (d - 0.641583) - 0.665888).exp();
    let hg = henyey_greenstein(cos_theta, g_hg);
    hg * (1.0 - w_d) + draine(cos_theta, g_d, alpha) * w_d
}

/// Droplet lobe blended toward isotropic as transmittance drops.
pub fn multiple_scattering_phase(cos_theta: f32, transmittance: f32) -> f32 {
    let t = transmittance.clamp(0.0, 1.0);
    let iso = 1.0 - t.sqrt();
    droplet_phase(cos_theta) * (1.0 - iso) + INV_FOUR_PI * iso
}

/// Real L2 SH basis evaluated at unit direction `d`.
pub fn sh_basis(d: Vec3) -> [f32; SH_COEFFICIENTS] {
    [
        0.282095,
        0.488603 * d.y,
        0.488603 * d.z,
        0.488603 * d.x,
        1.092548 * d.x * d.y,
        1.092548 * d.y * d.z,
        0.315392 * (3.0 * d.z * d.z - 1.0),
        1.092548 * d.x * d.z,
        0.546274 * (d.x * d.x - d.y * d.y),
    ]
}

/// Per-texel inputs of one radiance sample.
#[derive(Clone, Copy, Debug)]
pub struct TexelSample {
    pub radiance: f32,
    pub transmittance: f32,
    pub view_dir: Vec3,
    pub light_dir: Vec3,
}

impl TexelSample {
    pub fn cos_theta(&self) -> f32 {
        (-self.view_dir).dot(self.light_dir)
    }

    pub fn phase(&self) -> f32 {
        multiple_scattering_phase(self.cos_theta(), self.transmittance)
    }
}

/// Coefficients of one texel, accumulated the same way the bake kernel does.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShTexel(pub [f32; SH_COEFFICIENTS]);

impl ShTexel {
    pub fn accumulate(&mut self, sample: &TexelSample, weight: f32) {
        let corrected = sample.radiance / sample.phase();
        let scale = corrected * weight * FOUR_PI;
        for (c, y) in self.0.iter_mut().zip(sh_basis(sample.light_dir)) {
            *c += y * scale;
        }
    }

    /// Phase-corrected radiance towards `light_dir`.
    pub fn evaluate(&self, light_dir: Vec3) -> f32 {
        self.0
            .iter()
            .zip(sh_basis(light_dir))
            .map(|(c, y)| c * y)
            .sum()
    }

    /// Radiance the validation kernel reconstructs for `sample`'s geometry.
    pub fn reconstruct(&self, sample: &TexelSample) -> f32 {
        self.evaluate(sample.light_dir) * sample.phase()
    }

    /// Coefficients `3*i .. 3*i+3`, as stored in accumulator `i`.
    pub fn packed(&self, accumulator: usize) -> [f32; 3] {
        let base = accumulator * 3;
        [self.0[base], self.0[base + 1], self.0[base + 2]]
    }
}
