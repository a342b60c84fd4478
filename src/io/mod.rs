//! IO module aggregating DDS read/write and GPU upload helpers.

pub mod dds_read;
pub mod dds_write;
pub mod tex_upload;

pub use dds_read::{decode_dds, load_dds, HostImage};
pub use dds_write::{write_dds_bc6h_sf16, write_dds_r32f};
