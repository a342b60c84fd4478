// src/catalog/texture_set.rs
// Input images grouped per identifier/face and the checks a set must pass before baking
// RELEVANT FILES: src/catalog/mod.rs, src/bake/pipeline.rs

use glam::Vec3;
use log::warn;

use super::filename::{Face, NameRole, ParsedName};
use crate::error::{BakeError, BakeResult};

/// Pixel dimensions of a loaded image handle.
pub trait ImageExtent {
    fn extent(&self) -> (u32, u32);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputRole {
    Transmittance,
    /// Unit-length light direction.
    RadianceSample { light_dir: Vec3 },
}

/// One ingested input file and the image loaded for it.
#[derive(Debug)]
pub struct InputImage<T> {
    pub file_name: String,
    pub identifier: String,
    pub face: Face,
    pub role: InputRole,
    pub width: u32,
    pub height: u32,
    pub handle: T,
}

impl<T: ImageExtent> InputImage<T> {
    /// Normalizes the light direction of radiance samples.
    pub fn new(file_name: &str, parsed: ParsedName, handle: T) -> BakeResult<Self> {
        let role = match parsed.role {
            NameRole::Transmittance => InputRole::Transmittance,
            NameRole::RadianceSample { light_dir } => {
                let unit = light_dir.try_normalize().ok_or_else(|| {
                    BakeError::asset(format!("{file_name}: light direction has zero length"))
                })?;
                InputRole::RadianceSample { light_dir: unit }
            }
        };
        let (width, height) = handle.extent();
        Ok(Self {
            file_name: file_name.to_string(),
            identifier: parsed.identifier,
            face: parsed.face,
            role,
            width,
            height,
            handle,
        })
    }
}

impl<T> InputImage<T> {
    pub fn key(&self) -> String {
        super::filename::set_key(&self.identifier, self.face)
    }

    pub fn light_dir(&self) -> Option<Vec3> {
        match self.role {
            InputRole::RadianceSample { light_dir } => Some(light_dir),
            InputRole::Transmittance => None,
        }
    }
}

/// Why a set was abandoned without writing any output.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SetRejection {
    #[error("texture set {key} has no transmittance texture ({key}_tr.dds)")]
    MissingTransmittance { key: String },

    #[error("texture set {key} has no radiance samples")]
    NoRadianceSamples { key: String },

    #[error(
        "texture set {key} has more than one size: {file} is {found_w}x{found_h}, transmittance is {expected_w}x{expected_h}"
    )]
    SizeMismatch {
        key: String,
        file: String,
        expected_w: u32,
        expected_h: u32,
        found_w: u32,
        found_h: u32,
    },
}

impl SetRejection {
    pub fn key(&self) -> &str {
        match self {
            SetRejection::MissingTransmittance { key }
            | SetRejection::NoRadianceSamples { key }
            | SetRejection::SizeMismatch { key, .. } => key,
        }
    }
}

/// Dimensions and per-sample weight of a set that passed validation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetPlan {
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Debug)]
pub struct TextureSet<T> {
    pub key: String,
    pub face: Face,
    pub transmittance: Option<InputImage<T>>,
    pub samples: Vec<InputImage<T>>,
}

impl<T> TextureSet<T> {
    pub fn new(key: String, face: Face) -> Self {
        Self {
            key,
            face,
            transmittance: None,
            samples: Vec::new(),
        }
    }

    /// Adds an image to its slot. A second transmittance replaces the first.
    pub fn insert(&mut self, image: InputImage<T>) {
        match image.role {
            InputRole::Transmittance => {
                if let Some(previous) = self.transmittance.replace(image) {
                    warn!(
                        "\tTexture set {} already had transmittance {}; replacing it",
                        self.key, previous.file_name
                    );
                }
            }
            InputRole::RadianceSample { .. } => self.samples.push(image),
        }
    }

    /// Checks the preconditions of baking; any failure rejects the whole set.
    pub fn validate(&self) -> Result<SetPlan, SetRejection> {
        let tr = self
            .transmittance
            .as_ref()
            .ok_or_else(|| SetRejection::MissingTransmittance {
                key: self.key.clone(),
            })?;
        if self.samples.is_empty() {
            return Err(SetRejection::NoRadianceSamples {
                key: self.key.clone(),
            });
        }
        if let Some(odd) = self
            .samples
            .iter()
            .find(|s| s.width != tr.width || s.height != tr.height)
        {
            return Err(SetRejection::SizeMismatch {
                key: self.key.clone(),
                file: odd.file_name.clone(),
                expected_w: tr.width,
                expected_h: tr.height,
                found_w: odd.width,
                found_h: odd.height,
            });
        }
        Ok(SetPlan {
            width: tr.width,
            height: tr.height,
            weight: 1.0 / self.samples.len() as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filename::parse_input_name;

    #[derive(Debug)]
    struct Dummy(u32, u32);

    impl ImageExtent for Dummy {
        fn extent(&self) -> (u32, u32) {
            (self.0, self.1)
        }
    }

    fn image(name: &str, w: u32, h: u32) -> InputImage<Dummy> {
        InputImage::new(name, parse_input_name(name).unwrap(), Dummy(w, h)).unwrap()
    }

    fn set_with(images: Vec<InputImage<Dummy>>) -> TextureSet<Dummy> {
        let mut set = TextureSet::new("cloud_+z".into(), Face::PosZ);
        for img in images {
            set.insert(img);
        }
        set
    }

    #[test]
    fn direction_is_normalized_at_ingestion() {
        let img = image("cloud_+z_0_3_4.dds", 4, 4);
        let dir = img.light_dir().unwrap();
        assert!((dir - Vec3::new(0.0, 0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn zero_direction_is_an_asset_error() {
        let name = "cloud_+z_0_0_0.dds";
        let err = InputImage::new(name, parse_input_name(name).unwrap(), Dummy(1, 1)).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains(name));
    }

    #[test]
    fn weights_of_valid_set_sum_to_one() {
        for n in 1..=7 {
            let mut images = vec![image("cloud_+z_tr.dds", 8, 8)];
            for i in 0..n {
                images.push(image(&format!("cloud_+z_{}_0_1.dds", i), 8, 8));
            }
            let plan = set_with(images).validate().unwrap();
            let total: f32 = (0..n).map(|_| plan.weight).sum();
            assert!((total - 1.0).abs() < 1e-6, "n={n} total={total}");
            assert_eq!((plan.width, plan.height), (8, 8));
        }
    }

    #[test]
    fn size_mismatch_rejects_the_set() {
        let set = set_with(vec![
            image("cloud_+z_tr.dds", 64, 64),
            image("cloud_+z_0.00_0.00_1.00.dds", 32, 32),
        ]);
        let rejection = set.validate().unwrap_err();
        assert_eq!(rejection.key(), "cloud_+z");
        assert!(matches!(rejection, SetRejection::SizeMismatch { found_w: 32, .. }));
        assert!(rejection.to_string().contains("cloud_+z"));
    }

    #[test]
    fn missing_transmittance_rejects_the_set() {
        let set = set_with(vec![image("cloud_+z_1_0_0.dds", 16, 16)]);
        assert_eq!(
            set.validate().unwrap_err(),
            SetRejection::MissingTransmittance {
                key: "cloud_+z".into()
            }
        );
    }

    #[test]
    fn set_without_samples_is_rejected_instead_of_dividing_by_zero() {
        let set = set_with(vec![image("cloud_+z_tr.dds", 16, 16)]);
        assert!(matches!(
            set.validate(),
            Err(SetRejection::NoRadianceSamples { .. })
        ));
    }

    #[test]
    fn later_transmittance_replaces_earlier_one() {
        let mut set = set_with(vec![image("cloud_+z_tr.dds", 16, 16)]);
        let mut second = image("cloud_+z_tr.dds", 32, 32);
        second.file_name = "other/cloud_+z_tr.dds".into();
        set.insert(second);
        let tr = set.transmittance.as_ref().unwrap();
        assert_eq!(tr.file_name, "other/cloud_+z_tr.dds");
        assert_eq!(tr.width, 32);
    }

    #[test]
    fn samples_keep_insertion_order() {
        let set = set_with(vec![
            image("cloud_+z_0_0_1.dds", 4, 4),
            image("cloud_+z_tr.dds", 4, 4),
            image("cloud_+z_1_0_0.dds", 4, 4),
        ]);
        let names: Vec<&str> = set.samples.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, ["cloud_+z_0_0_1.dds", "cloud_+z_1_0_0.dds"]);
    }
}
