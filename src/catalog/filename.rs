// src/catalog/filename.rs
// Input/output file naming grammar for texture sets
// RELEVANT FILES: src/catalog/mod.rs, src/bake/writer.rs, src/bake/validate.rs

use std::fmt;
use std::str::FromStr;

use glam::Vec3;

/// Extension of every input and output container.
pub const IMAGE_EXTENSION: &str = "dds";

const TRANSMITTANCE_SUFFIX: &str = "_tr";

/// One of the five directional faces a texture set is baked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
}

impl Face {
    pub const ALL: [Face; 5] = [Face::PosX, Face::NegX, Face::PosY, Face::NegY, Face::PosZ];

    pub fn as_str(self) -> &'static str {
        match self {
            Face::PosX => "+x",
            Face::NegX => "-x",
            Face::PosY => "+y",
            Face::NegY => "-y",
            Face::PosZ => "+z",
        }
    }

    /// Index shared with the kernels' face mapping.
    pub fn index(self) -> u32 {
        match self {
            Face::PosX => 0,
            Face::NegX => 1,
            Face::PosY => 2,
            Face::NegY => 3,
            Face::PosZ => 4,
        }
    }
}

impl FromStr for Face {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "+x" => Ok(Face::PosX),
            "-x" => Ok(Face::NegX),
            "+y" => Ok(Face::PosY),
            "-y" => Ok(Face::NegY),
            "+z" => Ok(Face::PosZ),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched file name says about its image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NameRole {
    Transmittance,
    /// Light direction as written in the name, not yet normalized.
    RadianceSample { light_dir: Vec3 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedName {
    pub identifier: String,
    pub face: Face,
    pub role: NameRole,
}

impl ParsedName {
    pub fn key(&self) -> String {
        set_key(&self.identifier, self.face)
    }
}

/// Group key of a texture set: `{identifier}_{face}`.
pub fn set_key(identifier: &str, face: Face) -> String {
    format!("{identifier}_{face}")
}

/// Match a file name against the transmittance and radiance grammars.
///
/// Both grammars are anchored full matches; the identifier may contain
/// underscores and is everything before the face field.
pub fn parse_input_name(file_name: &str) -> Option<ParsedName> {
    let stem = file_name
        .strip_suffix(IMAGE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))?;

    if let Some(head) = stem.strip_suffix(TRANSMITTANCE_SUFFIX) {
        if let Some((identifier, face)) = split_face(head) {
            return Some(ParsedName {
                identifier: identifier.to_string(),
                face,
                role: NameRole::Transmittance,
            });
        }
    }

    let mut fields = stem.rsplitn(5, '_');
    let lz = fields.next()?;
    let ly = fields.next()?;
    let lx = fields.next()?;
    let face = fields.next()?.parse::<Face>().ok()?;
    let identifier = fields.next()?;

    let light_dir = Vec3::new(parse_decimal(lx)?, parse_decimal(ly)?, parse_decimal(lz)?);
    Some(ParsedName {
        identifier: identifier.to_string(),
        face,
        role: NameRole::RadianceSample { light_dir },
    })
}

fn split_face(head: &str) -> Option<(&str, Face)> {
    let (identifier, face) = head.rsplit_once('_')?;
    Some((identifier, face.parse::<Face>().ok()?))
}

/// `[+-]?(\d*\.\d+|\d+\.\d*|\d+)`
fn is_signed_decimal(value: &str) -> bool {
    let body = value.strip_prefix(|c| c == '+' || c == '-').unwrap_or(value);
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    match body.split_once('.') {
        Some((int, frac)) => {
            all_digits(int) && all_digits(frac) && !(int.is_empty() && frac.is_empty())
        }
        None => !body.is_empty() && all_digits(body),
    }
}

fn parse_decimal(value: &str) -> Option<f32> {
    if !is_signed_decimal(value) {
        return None;
    }
    value.parse::<f32>().ok()
}

pub fn format_transmittance_name(identifier: &str, face: Face) -> String {
    format!("{identifier}_{face}{TRANSMITTANCE_SUFFIX}.{IMAGE_EXTENSION}")
}

pub fn format_radiance_name(identifier: &str, face: Face, light_dir: Vec3) -> String {
    format!(
        "{identifier}_{face}_{}_{}_{}.{IMAGE_EXTENSION}",
        light_dir.x, light_dir.y, light_dir.z
    )
}

/// `{key}_sh{index}.dds`
pub fn sh_output_name(key: &str, index: usize) -> String {
    format!("{key}_sh{index}.{IMAGE_EXTENSION}")
}

/// `{key}_{lx:.2}_{ly:.2}_{lz:.2}_re.dds`
pub fn validation_output_name(key: &str, light_dir: Vec3) -> String {
    format!(
        "{key}_{:.2}_{:.2}_{:.2}_re.{IMAGE_EXTENSION}",
        light_dir.x, light_dir.y, light_dir.z
    )
}
