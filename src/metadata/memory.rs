use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{MetadataStore, VersionRecord};
use crate::domain::model::{Package, PackageId, PackageVersion};

/// Metadata store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    packages: RwLock<HashMap<PackageId, BTreeMap<PackageVersion, Package>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    #[tracing::instrument(skip(self, id), fields(id = %id))]
    async fn get_versions(&self, id: &PackageId) -> Result<Vec<VersionRecord>> {
        let packages = self
            .packages
            .read()
            .map_err(|_| anyhow!("Metadata lock is poisoned"))?;

        Ok(packages
            .get(id)
            .map(|versions| versions.values().rev().map(VersionRecord::from).collect())
            .unwrap_or_default())
    }

    #[tracing::instrument(skip(self, package), fields(id = %package.id, version = %package.version))]
    async fn put(&self, package: Package) -> Result<()> {
        let mut packages = self
            .packages
            .write()
            .map_err(|_| anyhow!("Metadata lock is poisoned"))?;

        packages
            .entry(package.id.clone())
            .or_default()
            .insert(package.version.clone(), package);
        Ok(())
    }
}
