// src/bake/writer.rs
// Captures the accumulators and persists them as BC6H_SF16 DDS files
// RELEVANT FILES: src/io/dds_write.rs, src/core/readback.rs, src/bake/accumulate.rs

use std::path::PathBuf;

use log::info;

use super::accumulate::AccumulationContext;
use crate::catalog::filename::sh_output_name;
use crate::core::ResourceManager;
use crate::error::{BakeError, BakeResult};
use crate::io::write_dds_bc6h_sf16;

pub struct AssetWriter {
    output_dir: PathBuf,
}

impl AssetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write `{key}_sh0.dds` .. `{key}_sh2.dds`. Any failure aborts the run.
    pub fn write_accumulators(
        &self,
        resources: &ResourceManager,
        context: &AccumulationContext<'_>,
    ) -> BakeResult<Vec<PathBuf>> {
        let plan = context.plan();
        let mut written = Vec::with_capacity(context.accumulators().len());
        for (index, image) in context.accumulators().iter().enumerate() {
            let path = self.output_dir.join(sh_output_name(context.key(), index));
            let texels = resources.capture_image(image)?;
            write_dds_bc6h_sf16(&path, &texels, plan.width, plan.height)
                .map_err(|e| BakeError::persist(format!("{e:#}")))?;
            info!("\tWrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}
