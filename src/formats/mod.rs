//! Texture container payload codecs
//!
//! Block compression used when persisting baked accumulators.

pub mod bc6h;
pub use bc6h::{compress_rgba_f32, decompress_to_rgba_f32};
