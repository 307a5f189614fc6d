//! Metadata store abstraction.
//!
//! The metadata store is the authoritative record of every published
//! version. The search core only reads from it; [`MetadataStore::put`]
//! exists for the ingestion side that feeds it.

mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::model::{DependencyGroup, Package, PackageId, PackageVersion};

pub use memory::MemoryMetadataStore;

/// One known version of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRecord {
    pub version: PackageVersion,
    pub listed: bool,
    pub dependency_groups: Vec<DependencyGroup>,
}

impl From<&Package> for VersionRecord {
    fn from(package: &Package) -> Self {
        Self {
            version: package.version.clone(),
            listed: package.listed,
            dependency_groups: package.dependency_groups.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// All known versions of `id`, highest precedence first. Unknown ids
    /// yield an empty list.
    async fn get_versions(&self, id: &PackageId) -> Result<Vec<VersionRecord>>;

    /// Record a published version, replacing any previous record for the
    /// same `(id, version)`.
    async fn put(&self, package: Package) -> Result<()>;
}
