//! Deterministic result ordering.
//!
//! Any index sink may compute its own relevance score; the order of hits
//! with equal scores is fixed here so that paging is stable across calls.

use std::cmp::Ordering;

use crate::index::QueryHit;

/// Order hits by score (descending), then id (ascending, case-insensitive),
/// then version (descending precedence).
pub fn compare_hits(a: &QueryHit, b: &QueryHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.document.id.cmp(&b.document.id))
        .then_with(|| b.document.version.cmp(&a.document.version))
}

/// Sort hits in place with [`compare_hits`].
pub fn sort_hits(hits: &mut [QueryHit]) {
    hits.sort_by(compare_hits);
}
