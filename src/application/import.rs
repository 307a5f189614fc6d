//! Import use case - publishes catalog packages into the metadata store and
//! the search index.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::domain::model::{IndexDocument, Package, PackageId};
use crate::domain::service::SearchService;
use crate::metadata::MetadataStore;

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    /// Number of `(id, version)` pairs indexed.
    pub versions: usize,
    /// Number of distinct package ids.
    pub packages: usize,
    /// Documents written, in import order.
    pub documents: Vec<IndexDocument>,
}

/// Import use case
pub struct ImportUseCase<'a> {
    service: &'a SearchService,
    metadata: &'a dyn MetadataStore,
}

impl<'a> ImportUseCase<'a> {
    pub fn new(service: &'a SearchService, metadata: &'a dyn MetadataStore) -> Self {
        Self { service, metadata }
    }

    /// Record every package in the metadata store, then index it.
    ///
    /// Stops at the first failure; packages imported before it stay
    /// imported.
    #[tracing::instrument(skip(self, packages, token))]
    pub async fn import(
        &self,
        packages: Vec<Package>,
        token: &CancellationToken,
    ) -> Result<ImportSummary> {
        let mut ids: HashSet<PackageId> = HashSet::new();
        let mut documents = Vec::with_capacity(packages.len());

        for package in packages {
            let label = format!("{}@{}", package.id, package.version.normalized());
            debug!("Importing {}", label);

            self.metadata
                .put(package.clone())
                .await
                .with_context(|| format!("Failed to record {}", label))?;
            let document = self
                .service
                .index(&package, token)
                .await
                .with_context(|| format!("Failed to index {}", label))?;

            ids.insert(package.id);
            documents.push(document);
        }

        info!(
            "Imported {} version(s) of {} package(s)",
            documents.len(),
            ids.len()
        );

        Ok(ImportSummary {
            versions: documents.len(),
            packages: ids.len(),
            documents,
        })
    }
}
