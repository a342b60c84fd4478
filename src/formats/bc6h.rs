//! BC6H signed-float (BC6H_SF16) block codec
//!
//! The encoder emits mode 11 blocks only: a single region with 10-bit
//! endpoints and 4-bit indices, no endpoint transform. Endpoints are chosen
//! from the block's bounding box, trying each of its four diagonals and
//! keeping the one with the lowest squared error. The decoder understands the
//! same mode and is used to check round trips.

use half::f16;

pub const BLOCK_DIM: u32 = 4;
pub const BLOCK_BYTES: usize = 16;

const MODE_11: u32 = 0b00011;
const MODE_BITS: u32 = 5;
const ENDPOINT_BITS: u32 = 10;
const INDEX_BITS: u32 = 4;
const F16_MAX: i32 = 0x7BFF;
const WEIGHTS: [i32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

type Texel = [i32; 3];

/// Signed half-float magnitude as an integer, clamped to the largest finite half.
fn f32_to_signed_int(value: f32) -> i32 {
    let value = if value.is_nan() { 0.0 } else { value };
    let bits = f16::from_f32(value).to_bits();
    let magnitude = ((bits & 0x7FFF) as i32).min(F16_MAX);
    if bits & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn quantize(value: i32) -> i32 {
    let magnitude = (value.abs() << (ENDPOINT_BITS - 1)) / (F16_MAX + 1);
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Endpoint whose decoded value lies at or below (`upper == false`) or at or
/// above (`upper == true`) `value`, so the palette brackets the texels.
fn quantize_bound(value: i32, upper: bool) -> i32 {
    let q = quantize(value);
    let limit = (1 << (ENDPOINT_BITS - 1)) - 1;
    let decoded = |c: i32| finish_unquantize(unquantize(c));
    let candidates = [q - 1, q, q + 1];
    let found = if upper {
        candidates
            .into_iter()
            .filter(|c| c.abs() <= limit)
            .find(|&c| decoded(c) >= value)
    } else {
        candidates
            .into_iter()
            .rev()
            .filter(|c| c.abs() <= limit)
            .find(|&c| decoded(c) <= value)
    };
    found.unwrap_or(q)
}

fn unquantize(q: i32) -> i32 {
    let magnitude = q.abs();
    let unq = if magnitude == 0 {
        0
    } else if magnitude >= (1 << (ENDPOINT_BITS - 1)) - 1 {
        0x7FFF
    } else {
        ((magnitude << 15) + 0x4000) >> (ENDPOINT_BITS - 1)
    };
    if q < 0 {
        -unq
    } else {
        unq
    }
}

fn interpolate(a: i32, b: i32, index: usize) -> i32 {
    let w = WEIGHTS[index];
    (a * (64 - w) + b * w + 32) >> 6
}

/// Rescale an interpolated value into signed half-float magnitude.
fn finish_unquantize(value: i32) -> i32 {
    if value < 0 {
        -(((-value) * 31) >> 5)
    } else {
        (value * 31) >> 5
    }
}

fn signed_int_to_f32(value: i32) -> f32 {
    let bits = if value < 0 {
        0x8000 | (-value) as u16
    } else {
        value as u16
    };
    f16::from_bits(bits).to_f32()
}

fn palette(qa: Texel, qb: Texel) -> [Texel; 16] {
    let ua = qa.map(unquantize);
    let ub = qb.map(unquantize);
    std::array::from_fn(|i| std::array::from_fn(|c| finish_unquantize(interpolate(ua[c], ub[c], i))))
}

fn distance(a: &Texel, b: &Texel) -> i64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = (x - y) as i64;
            d * d
        })
        .sum()
}

/// Pick the nearest palette entry per texel; returns indices and total error.
fn assign_indices(texels: &[Texel; 16], qa: Texel, qb: Texel) -> ([u8; 16], i64) {
    let entries = palette(qa, qb);
    let mut indices = [0u8; 16];
    let mut total = 0i64;
    for (slot, texel) in indices.iter_mut().zip(texels) {
        let (best, err) = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, distance(entry, texel)))
            .min_by_key(|&(_, err)| err)
            .unwrap_or((0, 0));
        *slot = best as u8;
        total += err;
    }
    (indices, total)
}

struct BitWriter {
    bits: u128,
    pos: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self { bits: 0, pos: 0 }
    }

    fn push(&mut self, value: u32, count: u32) {
        let mask = (1u128 << count) - 1;
        self.bits |= ((value as u128) & mask) << self.pos;
        self.pos += count;
    }
}

struct BitReader {
    bits: u128,
    pos: u32,
}

impl BitReader {
    fn take(&mut self, count: u32) -> u32 {
        let value = (self.bits >> self.pos) & ((1u128 << count) - 1);
        self.pos += count;
        value as u32
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Encode 16 RGB texels (row-major 4x4) into one mode 11 block.
pub fn encode_block(rgb: &[[f32; 3]; 16]) -> [u8; BLOCK_BYTES] {
    let texels: [Texel; 16] = rgb.map(|px| px.map(f32_to_signed_int));

    let mut lo = [i32::MAX; 3];
    let mut hi = [i32::MIN; 3];
    for texel in &texels {
        for c in 0..3 {
            lo[c] = lo[c].min(texel[c]);
            hi[c] = hi[c].max(texel[c]);
        }
    }

    let q_lo = lo.map(|v| quantize_bound(v, false));
    let q_hi = hi.map(|v| quantize_bound(v, true));

    let mut best: Option<(Texel, Texel, [u8; 16], i64)> = None;
    for diagonal in 0..4 {
        let mut qa = q_lo;
        let mut qb = q_hi;
        if diagonal & 1 != 0 {
            std::mem::swap(&mut qa[1], &mut qb[1]);
        }
        if diagonal & 2 != 0 {
            std::mem::swap(&mut qa[2], &mut qb[2]);
        }
        let (indices, err) = assign_indices(&texels, qa, qb);
        if best.as_ref().map_or(true, |&(_, _, _, e)| err < e) {
            best = Some((qa, qb, indices, err));
        }
    }
    let (mut qa, mut qb, mut indices, _) = best.unwrap_or((q_lo, q_hi, [0; 16], 0));

    // The anchor index is stored with its top bit implied zero.
    if indices[0] >= 8 {
        std::mem::swap(&mut qa, &mut qb);
        for index in indices.iter_mut() {
            *index = 15 - *index;
        }
    }

    let mut writer = BitWriter::new();
    writer.push(MODE_11, MODE_BITS);
    for endpoint in [qa, qb] {
        for value in endpoint {
            writer.push(value as u32, ENDPOINT_BITS);
        }
    }
    writer.push(indices[0] as u32, INDEX_BITS - 1);
    for &index in &indices[1..] {
        writer.push(index as u32, INDEX_BITS);
    }
    debug_assert_eq!(writer.pos, 128);
    writer.bits.to_le_bytes()
}

/// Decode a mode 11 block; returns `None` for any other mode.
pub fn decode_block(block: &[u8; BLOCK_BYTES]) -> Option<[[f32; 3]; 16]> {
    let mut reader = BitReader {
        bits: u128::from_le_bytes(*block),
        pos: 0,
    };
    if reader.take(MODE_BITS) != MODE_11 {
        return None;
    }
    let mut endpoints = [[0i32; 3]; 2];
    for endpoint in endpoints.iter_mut() {
        for value in endpoint.iter_mut() {
            *value = sign_extend(reader.take(ENDPOINT_BITS), ENDPOINT_BITS);
        }
    }
    let entries = palette(endpoints[0], endpoints[1]);

    let mut out = [[0.0f32; 3]; 16];
    for (i, texel) in out.iter_mut().enumerate() {
        let bits = if i == 0 { INDEX_BITS - 1 } else { INDEX_BITS };
        let index = reader.take(bits) as usize;
        *texel = entries[index].map(signed_int_to_f32);
    }
    Some(out)
}

fn block_count(extent: u32) -> u32 {
    (extent + BLOCK_DIM - 1) / BLOCK_DIM
}

/// Compress the RGB channels of a tight RGBA32F image. Edge blocks replicate
/// the last row and column.
pub fn compress_rgba_f32(rgba: &[f32], width: u32, height: u32) -> Vec<u8> {
    let (bw, bh) = (block_count(width), block_count(height));
    let mut out = Vec::with_capacity((bw * bh) as usize * BLOCK_BYTES);
    for by in 0..bh {
        for bx in 0..bw {
            let texels: [[f32; 3]; 16] = std::array::from_fn(|i| {
                let x = (bx * BLOCK_DIM + i as u32 % BLOCK_DIM).min(width - 1);
                let y = (by * BLOCK_DIM + i as u32 / BLOCK_DIM).min(height - 1);
                let base = ((y * width + x) * 4) as usize;
                [rgba[base], rgba[base + 1], rgba[base + 2]]
            });
            out.extend_from_slice(&encode_block(&texels));
        }
    }
    out
}

/// Inverse of [`compress_rgba_f32`]; alpha is written as 1.0.
pub fn decompress_to_rgba_f32(blocks: &[u8], width: u32, height: u32) -> Option<Vec<f32>> {
    let (bw, bh) = (block_count(width), block_count(height));
    if blocks.len() != (bw * bh) as usize * BLOCK_BYTES {
        return None;
    }
    let mut out = vec![0.0f32; (width * height * 4) as usize];
    for (block_index, chunk) in blocks.chunks_exact(BLOCK_BYTES).enumerate() {
        let block: &[u8; BLOCK_BYTES] = chunk.try_into().ok()?;
        let texels = decode_block(block)?;
        let (bx, by) = (block_index as u32 % bw, block_index as u32 / bw);
        for (i, texel) in texels.iter().enumerate() {
            let x = bx * BLOCK_DIM + i as u32 % BLOCK_DIM;
            let y = by * BLOCK_DIM + i as u32 / BLOCK_DIM;
            if x >= width || y >= height {
                continue;
            }
            let base = ((y * width + x) * 4) as usize;
            out[base..base + 3].copy_from_slice(texel);
            out[base + 3] = 1.0;
        }
    }
    Some(out)
}
