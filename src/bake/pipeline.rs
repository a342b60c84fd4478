// src/bake/pipeline.rs
// Drives a whole run: device setup, kernel compilation, catalog build and per-set baking
// Set-level rejections are collected; any other error aborts the run
// RELEVANT FILES: src/bake/accumulate.rs, src/bake/writer.rs, src/bake/validate.rs, src/catalog/mod.rs

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::accumulate::AccumulationContext;
use super::kernels::BakeKernels;
use super::validate::ValidationReconstructor;
use super::writer::AssetWriter;
use crate::catalog::{build_catalog, Catalog, SetRejection, TextureSet};
use crate::cli::BakeConfig;
use crate::core::{GpuImage, ResourceManager};
use crate::error::{BakeError, BakeResult};
use crate::gpu::GpuContext;
use crate::io::load_dds;

/// Files written for one baked set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BakedSet {
    pub key: String,
    pub outputs: Vec<PathBuf>,
    pub validation: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SetOutcome {
    Baked(BakedSet),
    Skipped(SetRejection),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakeSummary {
    pub baked: Vec<BakedSet>,
    pub skipped: Vec<SetRejection>,
}

impl BakeSummary {
    fn record(&mut self, outcome: SetOutcome) {
        match outcome {
            SetOutcome::Baked(set) => self.baked.push(set),
            SetOutcome::Skipped(rejection) => self.skipped.push(rejection),
        }
    }

    pub fn was_skipped(&self, key: &str) -> bool {
        self.skipped.iter().any(|r| r.key() == key)
    }
}

pub struct Baker {
    resources: ResourceManager,
    kernels: BakeKernels,
    writer: AssetWriter,
    validator: Option<ValidationReconstructor>,
    input_dir: PathBuf,
}

impl Baker {
    /// Compile both kernels on `gpu`. Output directories must already exist.
    pub fn new(gpu: GpuContext, config: &BakeConfig) -> BakeResult<Self> {
        let resources = ResourceManager::new(gpu);
        let kernels = BakeKernels::compile(&resources, config.kernel_dir.as_deref())?;
        Ok(Self {
            resources,
            kernels,
            writer: AssetWriter::new(&config.output_dir),
            validator: config
                .validation_dir
                .as_ref()
                .map(ValidationReconstructor::new),
            input_dir: config.input_dir.clone(),
        })
    }

    /// Read every matching input and upload it as a scalar image.
    pub fn load_catalog(&self) -> BakeResult<Catalog<GpuImage>> {
        load_gpu_catalog(&self.resources, &self.input_dir)
    }

    /// Bake one set. A rejected set writes nothing.
    pub fn bake_set(&self, set: &TextureSet<GpuImage>) -> BakeResult<SetOutcome> {
        let plan = match set.validate() {
            Ok(plan) => plan,
            Err(rejection) => {
                warn!("\t{}", rejection);
                return Ok(SetOutcome::Skipped(rejection));
            }
        };
        let Some(transmittance) = set.transmittance.as_ref() else {
            return Ok(SetOutcome::Skipped(SetRejection::MissingTransmittance {
                key: set.key.clone(),
            }));
        };

        let mut context = AccumulationContext::new(&self.resources, &set.key, set.face, plan)?;
        for sample in &set.samples {
            context.accumulate(&self.kernels.bake, sample, &transmittance.handle)?;
        }
        let outputs = self.writer.write_accumulators(&self.resources, &context)?;

        let validation = match &self.validator {
            Some(validator) => Some(validator.reconstruct(
                &self.resources,
                &self.kernels.validation,
                &context,
                &transmittance.handle,
                set.samples.last(),
            )?),
            None => None,
        };

        Ok(SetOutcome::Baked(BakedSet {
            key: set.key.clone(),
            outputs,
            validation,
        }))
    }

    pub fn run(&self) -> BakeResult<BakeSummary> {
        let catalog = self.load_catalog()?;
        if catalog.is_empty() {
            warn!("No texture sets found in {}", self.input_dir.display());
        } else {
            info!("Found {} texture set(s)", catalog.len());
        }

        let mut summary = BakeSummary::default();
        for set in catalog {
            info!("Processing texture set {} ...", set.key);
            let outcome = self.bake_set(&set)?;
            if matches!(outcome, SetOutcome::Baked(_)) {
                info!("\tDone");
            }
            summary.record(outcome);
        }
        Ok(summary)
    }
}

/// Build the catalog of `dir` with every input uploaded to the device.
///
/// An input the device cannot hold is skipped like an unreadable file.
pub fn load_gpu_catalog(resources: &ResourceManager, dir: &Path) -> BakeResult<Catalog<GpuImage>> {
    build_catalog(dir, |path| {
        let host = load_dds(path)?;
        resources
            .upload_scalar_image(&path.display().to_string(), &host)
            .map_err(|err| match err {
                BakeError::Device(msg) => BakeError::asset(msg),
                other => other,
            })
    })
}

/// Prepare output directories, bring up the device and bake everything under
/// `config.input_dir`.
pub fn run(config: &BakeConfig) -> BakeResult<BakeSummary> {
    config.prepare_output_dirs()?;
    let gpu = GpuContext::new()?;
    let baker = Baker::new(gpu, config)?;
    let summary = baker.run()?;
    info!(
        "Baked {} set(s), skipped {}",
        summary.baked.len(),
        summary.skipped.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tracks_skipped_keys() {
        let mut summary = BakeSummary::default();
        summary.record(SetOutcome::Skipped(SetRejection::NoRadianceSamples {
            key: "cloud_+x".into(),
        }));
        summary.record(SetOutcome::Baked(BakedSet {
            key: "cloud_+z".into(),
            outputs: vec![],
            validation: None,
        }));
        assert!(summary.was_skipped("cloud_+x"));
        assert!(!summary.was_skipped("cloud_+z"));
        assert_eq!(summary.baked.len(), 1);
    }
}
