//! In-memory index sink.
//!
//! Documents live in an ordered map keyed by `(id, version)`. A reverse map
//! from depended-upon id to dependent document keys is kept in step with
//! every upsert so dependents lookups never scan the whole index.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::trace;

use super::{IndexQuery, IndexSink, QueryHit, QueryResult, ReverseDependency};
use crate::domain::model::{IndexDocument, PackageId, PackageVersion};
use crate::domain::service::ranking::sort_hits;

type DocumentKey = (PackageId, PackageVersion);

const EXACT_ID_POINTS: f64 = 10.0;
const ID_POINTS: f64 = 5.0;
const TITLE_POINTS: f64 = 3.0;
const TAG_POINTS: f64 = 2.0;
const DESCRIPTION_POINTS: f64 = 1.0;

#[derive(Debug, Default)]
struct IndexState {
    documents: BTreeMap<DocumentKey, IndexDocument>,
    dependents: HashMap<PackageId, BTreeSet<DocumentKey>>,
}

/// Index sink holding every document in process memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: RwLock<IndexState>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed `(id, version)` documents.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.read().unwrap().documents.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        self.state.read().map_err(|_| anyhow!("Index state lock is poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>> {
        self.state.write().map_err(|_| anyhow!("Index state lock is poisoned"))
    }
}

/// Relevance of a document for all terms, or `None` if some term is absent.
fn score(document: &IndexDocument, terms: &[String]) -> Option<f64> {
    let mut total = 0.0;
    for term in terms {
        let id = document.id.key();
        let keys = &document.keys;
        let mut points = 0.0;
        if id == term {
            points += EXACT_ID_POINTS;
        } else if id.contains(term.as_str()) {
            points += ID_POINTS;
        }
        if keys.title.contains(term.as_str()) {
            points += TITLE_POINTS;
        }
        if keys.tags.iter().any(|t| t == term) {
            points += TAG_POINTS;
        }
        if keys.description.contains(term.as_str()) {
            points += DESCRIPTION_POINTS;
        }
        if points == 0.0 {
            return None;
        }
        total += points;
    }
    Some(total)
}

fn passes_filters(document: &IndexDocument, query: &IndexQuery) -> bool {
    (query.include_unlisted || document.listed)
        && (query.include_prerelease || !document.prerelease)
        && (query.include_semver2 || !document.semver2)
        && query
            .package_type
            .as_ref()
            .is_none_or(|t| document.keys.package_types.contains(t))
        && query
            .framework
            .as_ref()
            .is_none_or(|f| document.keys.frameworks.contains(f))
}

#[async_trait]
impl IndexSink for MemoryIndex {
    #[tracing::instrument(skip(self, document), fields(id = %document.id, version = %document.version))]
    async fn upsert(&self, document: IndexDocument) -> Result<()> {
        let key = document.key();
        let mut state = self.write()?;

        if state.documents.get(&key) == Some(&document) {
            trace!("Document unchanged, skipping upsert");
            return Ok(());
        }

        if let Some(previous) = state.documents.remove(&key) {
            for dependency in &previous.dependencies {
                if let Some(keys) = state.dependents.get_mut(&dependency.id) {
                    keys.remove(&key);
                    if keys.is_empty() {
                        state.dependents.remove(&dependency.id);
                    }
                }
            }
        }

        for dependency in &document.dependencies {
            state
                .dependents
                .entry(dependency.id.clone())
                .or_default()
                .insert(key.clone());
        }
        state.documents.insert(key, document);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn query(&self, query: &IndexQuery) -> Result<QueryResult> {
        let state = self.read()?;

        // Documents are ordered by (id, version), so versions of one id are
        // adjacent and ascending.
        let mut hits: Vec<QueryHit> = Vec::new();
        for document in state.documents.values() {
            if !passes_filters(document, query) {
                continue;
            }
            let Some(points) = score(document, &query.terms) else {
                continue;
            };

            match hits.last_mut() {
                Some(hit) if hit.document.id == document.id => {
                    hit.versions.insert(0, document.version.clone());
                    hit.score = hit.score.max(points);
                    hit.document = document.clone();
                }
                _ => hits.push(QueryHit {
                    document: document.clone(),
                    score: points,
                    versions: vec![document.version.clone()],
                }),
            }
        }

        sort_hits(&mut hits);
        let total_hits = hits.len();
        let hits = hits
            .into_iter()
            .skip(query.skip)
            .take(query.take)
            .collect();

        Ok(QueryResult { hits, total_hits })
    }

    #[tracing::instrument(skip(self, target), fields(target = %target))]
    async fn reverse_dependencies(&self, target: &PackageId) -> Result<Vec<ReverseDependency>> {
        let state = self.read()?;
        let Some(keys) = state.dependents.get(target) else {
            return Ok(Vec::new());
        };

        Ok(keys
            .iter()
            .filter_map(|key| state.documents.get(key))
            .filter_map(|document| {
                document.range_for(target).map(|range| ReverseDependency {
                    dependent_id: document.id.clone(),
                    dependent_version: document.version.clone(),
                    range: range.to_string(),
                    listed: document.listed,
                    description: document.description.clone(),
                })
            })
            .collect())
    }
}
