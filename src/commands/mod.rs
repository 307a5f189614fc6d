use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::{
    application::ImportUseCase,
    catalog::load_manifest,
    domain::model::{DependentsRequest, SearchRequest},
    runtime::Runtime,
};

pub mod config;

use config::Config;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{}", rendered);
    Ok(())
}

/// Search the catalog and print the response as JSON.
#[tracing::instrument(skip(runtime, catalog_root, token))]
pub async fn search<R: Runtime>(
    runtime: R,
    catalog_root: Option<PathBuf>,
    max_page_size: Option<usize>,
    request: SearchRequest,
    token: CancellationToken,
) -> Result<()> {
    let config = Config::new(runtime, catalog_root, max_page_size)?;
    let (service, _metadata, summary) = config.load_service(&token).await?;
    debug!("Catalog holds {} package(s)", summary.packages);

    let response = service.search(request, &token).await?;
    print_json(&response)
}

/// Find dependents of a package in the catalog and print them as JSON.
#[tracing::instrument(skip(runtime, catalog_root, token))]
pub async fn dependents<R: Runtime>(
    runtime: R,
    catalog_root: Option<PathBuf>,
    max_page_size: Option<usize>,
    request: DependentsRequest,
    token: CancellationToken,
) -> Result<()> {
    let config = Config::new(runtime, catalog_root, max_page_size)?;
    let (service, _metadata, summary) = config.load_service(&token).await?;
    debug!("Catalog holds {} package(s)", summary.packages);

    let response = service.find_dependents(request, &token).await?;
    print_json(&response)
}

/// Index the packages of one manifest on top of the catalog and print the
/// resulting documents as JSON.
#[tracing::instrument(skip(runtime, catalog_root, token))]
pub async fn index<R: Runtime>(
    runtime: R,
    catalog_root: Option<PathBuf>,
    manifest: &Path,
    token: CancellationToken,
) -> Result<()> {
    let config = Config::new(runtime, catalog_root, None)?;
    let packages = load_manifest(&config.runtime, manifest)?;
    if packages.is_empty() {
        println!("No packages in {:?}.", manifest);
        return Ok(());
    }

    let (service, metadata, _summary) = config.load_service(&token).await?;
    let summary = ImportUseCase::new(&service, metadata.as_ref())
        .import(packages, &token)
        .await
        .with_context(|| format!("Failed to index {:?}", manifest))?;

    print_json(&summary.documents)
}
