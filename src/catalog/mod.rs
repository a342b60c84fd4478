// src/catalog/mod.rs
// Turns a directory of input images into an ordered map of texture sets
// RELEVANT FILES: src/catalog/filename.rs, src/catalog/texture_set.rs, src/io/dds_read.rs

pub mod filename;
pub mod texture_set;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::BakeResult;

pub use filename::{parse_input_name, set_key, Face, NameRole, ParsedName, IMAGE_EXTENSION};
pub use texture_set::{ImageExtent, InputImage, InputRole, SetPlan, SetRejection, TextureSet};

/// A directory entry whose name matched one of the input grammars.
#[derive(Clone, Debug)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub parsed: ParsedName,
}

/// List the input directory in file-name order and keep entries that match
/// an input grammar. Everything else is logged and skipped.
pub fn scan_directory(dir: &Path) -> BakeResult<Vec<ScannedFile>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    let mut scanned = Vec::new();
    for path in entries {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !path.is_file() || path.extension().map_or(true, |ext| ext != IMAGE_EXTENSION) {
            info!("Skipping {}", file_name);
            continue;
        }
        match parse_input_name(&file_name) {
            Some(parsed) => scanned.push(ScannedFile {
                path,
                file_name,
                parsed,
            }),
            None => warn!("\t{} does not match the naming pattern.", file_name),
        }
    }
    Ok(scanned)
}

/// Texture sets keyed by `identifier_face`, iterated in key order.
#[derive(Debug)]
pub struct Catalog<T> {
    sets: BTreeMap<String, TextureSet<T>>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            sets: BTreeMap::new(),
        }
    }
}

impl<T> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: InputImage<T>) {
        let key = image.key();
        let face = image.face;
        self.sets
            .entry(key.clone())
            .or_insert_with(|| TextureSet::new(key, face))
            .insert(image);
    }

    pub fn get(&self, key: &str) -> Option<&TextureSet<T>> {
        self.sets.get(key)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}

impl<T> IntoIterator for Catalog<T> {
    type Item = TextureSet<T>;
    type IntoIter = std::collections::btree_map::IntoValues<String, TextureSet<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.into_values()
    }
}

/// Scan `dir` and load every matching file with `load`.
///
/// Recoverable load failures skip the file with a warning; any other error
/// aborts catalog construction.
pub fn build_catalog<T, F>(dir: &Path, mut load: F) -> BakeResult<Catalog<T>>
where
    T: ImageExtent,
    F: FnMut(&Path) -> BakeResult<T>,
{
    let mut catalog = Catalog::new();
    for file in scan_directory(dir)? {
        info!("Reading {} ...", file.file_name);
        let handle = match load(&file.path) {
            Ok(handle) => handle,
            Err(err) if err.is_recoverable() => {
                warn!("\tFailed to read texture from {}: {}", file.file_name, err);
                continue;
            }
            Err(err) => return Err(err),
        };
        let image = match InputImage::new(&file.file_name, file.parsed, handle) {
            Ok(image) => image,
            Err(err) => {
                warn!("\t{}", err);
                continue;
            }
        };
        info!(
            "\tLoaded {} ({} x {})",
            image.file_name, image.width, image.height
        );
        catalog.insert(image);
    }
    Ok(catalog)
}
