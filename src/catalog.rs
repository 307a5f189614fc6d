//! Catalog loading.
//!
//! A catalog is a directory tree of JSON manifests standing in for the
//! ingestion pipeline. Each file holds one package manifest or an array of
//! them; see [`Package`] for the format.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::model::Package;
use crate::runtime::Runtime;

/// Default file name pattern for manifests.
pub const MANIFEST_PATTERN: &str = "*.json";

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Many(Vec<Package>),
    One(Box<Package>),
}

/// Parse the contents of one manifest file.
pub fn parse_manifest(content: &str) -> Result<Vec<Package>> {
    let parsed: ManifestFile = serde_json::from_str(content)?;
    Ok(match parsed {
        ManifestFile::Many(packages) => packages,
        ManifestFile::One(package) => vec![*package],
    })
}

/// Read and parse one manifest file.
#[tracing::instrument(skip(runtime))]
pub fn load_manifest<R: Runtime>(runtime: &R, path: &Path) -> Result<Vec<Package>> {
    let content = runtime
        .read_to_string(path)
        .with_context(|| format!("Failed to read manifest {:?}", path))?;
    parse_manifest(&content).with_context(|| format!("Invalid manifest {:?}", path))
}

/// Find manifest files under `root`, recursing into subdirectories.
///
/// Paths are returned sorted so loading order is stable.
#[tracing::instrument(skip(runtime, root, pattern))]
pub fn find_manifests<R: Runtime>(
    runtime: &R,
    root: &Path,
    pattern: &glob::Pattern,
) -> Result<Vec<PathBuf>> {
    let mut manifests = Vec::new();

    if !runtime.exists(root) {
        return Ok(manifests);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in runtime.read_dir(&dir)? {
            if runtime.is_dir(&entry) {
                pending.push(entry);
            } else if entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| pattern.matches(name))
            {
                manifests.push(entry);
            }
        }
    }

    manifests.sort();
    Ok(manifests)
}

/// Loads every package of a catalog directory.
pub struct Catalog<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
    pattern: glob::Pattern,
}

impl<'a, R: Runtime> Catalog<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Result<Self> {
        Self::with_pattern(runtime, root, MANIFEST_PATTERN)
    }

    pub fn with_pattern(runtime: &'a R, root: PathBuf, pattern: &str) -> Result<Self> {
        let pattern = glob::Pattern::new(pattern)
            .with_context(|| format!("Invalid manifest pattern '{}'", pattern))?;
        Ok(Self {
            runtime,
            root,
            pattern,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every package, in manifest path order.
    pub fn load(&self) -> Result<Vec<Package>> {
        let paths = find_manifests(self.runtime, &self.root, &self.pattern)?;
        log::debug!("Found {} manifest file(s) under {:?}", paths.len(), self.root);

        let mut packages = Vec::new();
        for path in paths {
            packages.extend(load_manifest(self.runtime, &path)?);
        }
        Ok(packages)
    }
}
