use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    application::{ImportSummary, ImportUseCase},
    catalog::Catalog,
    config::SearchConfig,
    domain::service::SearchService,
    index::MemoryIndex,
    metadata::MemoryMetadataStore,
    runtime::Runtime,
};

/// Catalog directory used when none is given.
pub const DEFAULT_CATALOG_DIR: &str = "catalog";

/// Environment variable overriding the maximum page size.
pub const MAX_PAGE_SIZE_ENV: &str = "PKGSEARCH_MAX_PAGE_SIZE";

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub catalog_root: PathBuf,
    pub search: SearchConfig,
}

impl<R: Runtime> Config<R> {
    pub fn new(
        runtime: R,
        catalog_root: Option<PathBuf>,
        max_page_size: Option<usize>,
    ) -> Result<Self> {
        let catalog_root = match catalog_root {
            Some(path) => path,
            None => runtime.current_dir()?.join(DEFAULT_CATALOG_DIR),
        };

        let max_page_size = match max_page_size {
            Some(size) => Some(size),
            None => match runtime.env_var(MAX_PAGE_SIZE_ENV) {
                Ok(raw) => Some(raw.trim().parse::<usize>().with_context(|| {
                    format!("{} must be a positive integer, got '{}'", MAX_PAGE_SIZE_ENV, raw)
                })?),
                Err(_) => None,
            },
        };

        let mut search = SearchConfig::default();
        if let Some(size) = max_page_size {
            debug!("Using max page size {}", size);
            search = search.with_max_page_size(size);
        }

        Ok(Self {
            runtime,
            catalog_root,
            search,
        })
    }

    /// Build a service over fresh in-memory stores and import the catalog.
    #[tracing::instrument(skip(self, token))]
    pub async fn load_service(
        &self,
        token: &CancellationToken,
    ) -> Result<(SearchService, Arc<MemoryMetadataStore>, ImportSummary)> {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let service = SearchService::new(
            Arc::new(MemoryIndex::new()),
            metadata.clone(),
            self.search,
        );

        let catalog = Catalog::new(&self.runtime, self.catalog_root.clone())?;
        let packages = catalog
            .load()
            .with_context(|| format!("Failed to load catalog {:?}", catalog.root()))?;

        let summary = ImportUseCase::new(&service, metadata.as_ref())
            .import(packages, token)
            .await?;

        Ok((service, metadata, summary))
    }
}
