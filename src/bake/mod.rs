//! SH baking: kernel parameters, per-set accumulation, output and validation.
//!
//! `sh` mirrors the kernel math on the host and is the reference the GPU
//! results are checked against.

pub mod accumulate;
pub mod kernels;
pub mod params;
pub mod pipeline;
pub mod sh;
pub mod validate;
pub mod writer;

pub use accumulate::AccumulationContext;
pub use kernels::BakeKernels;
pub use params::BakeParams;
pub use pipeline::{load_gpu_catalog, run, BakeSummary, BakedSet, Baker, SetOutcome};
pub use validate::ValidationReconstructor;
pub use writer::AssetWriter;
