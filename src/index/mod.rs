//! Index sink abstraction.
//!
//! The index sink is the query-optimized store behind search and dependents
//! lookups. The service talks to it only through [`IndexSink`], so any
//! ranking engine honoring the query contract can be swapped in.
//!
//! # Contract
//!
//! - `upsert` replaces the document stored under `(id, version)` atomically,
//!   including its reverse dependency entries.
//! - `query` applies every filter before paging, reports `total_hits` for
//!   the whole filtered set and returns one hit per package id, ordered by
//!   [`compare_hits`](crate::domain::service::ranking::compare_hits).
//! - `reverse_dependencies` returns every indexed version that declares a
//!   dependency on the target id, listed or not.

mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::model::{IndexDocument, PackageId, PackageVersion};

pub use memory::MemoryIndex;

/// A combined, conjunctive query predicate plus a paging window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexQuery {
    /// Lower-cased search terms; empty matches everything.
    pub terms: Vec<String>,
    pub include_prerelease: bool,
    pub include_semver2: bool,
    pub include_unlisted: bool,
    /// Lower-cased exact package type.
    pub package_type: Option<String>,
    /// Lower-cased exact framework tag.
    pub framework: Option<String>,
    pub skip: usize,
    pub take: usize,
}

impl IndexQuery {
    /// Split a free-text query into lower-cased terms.
    pub fn terms_from(query: &str) -> Vec<String> {
        query
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

/// One package id in a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// Document of the highest matching version.
    pub document: IndexDocument,
    pub score: f64,
    /// All matching versions of this id, highest first.
    pub versions: Vec<PackageVersion>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub hits: Vec<QueryHit>,
    pub total_hits: usize,
}

/// An indexed version declaring a dependency on some target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseDependency {
    pub dependent_id: PackageId,
    pub dependent_version: PackageVersion,
    pub range: String,
    /// Listed state as last indexed.
    pub listed: bool,
    pub description: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Insert or replace the document keyed by its `(id, version)`.
    async fn upsert(&self, document: IndexDocument) -> Result<()>;

    /// Run a filtered, ranked and paged query.
    async fn query(&self, query: &IndexQuery) -> Result<QueryResult>;

    /// Every indexed version that depends on `target`.
    async fn reverse_dependencies(&self, target: &PackageId) -> Result<Vec<ReverseDependency>>;
}
