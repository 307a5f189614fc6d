//! Dependents resolution.
//!
//! Reverse dependency entries arrive one per `(dependent id, version)`.
//! They are collapsed to a single representative version per dependent id:
//! the highest listed version that references the target, or the highest
//! version overall when none of them is listed.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::model::{DependentResult, PackageId};
use crate::index::ReverseDependency;
use crate::metadata::VersionRecord;

/// Override the index-recorded listed state with the metadata store's.
///
/// Versions the store does not know keep the state recorded in the index.
pub fn apply_listed_state(
    entries: &mut [ReverseDependency],
    records: &HashMap<PackageId, Vec<VersionRecord>>,
) {
    for entry in entries.iter_mut() {
        let known = records
            .get(&entry.dependent_id)
            .and_then(|versions| versions.iter().find(|r| r.version == entry.dependent_version));
        if let Some(record) = known {
            entry.listed = record.listed;
        }
    }
}

/// Choose the representative version among entries of one dependent id.
pub fn select_representative(entries: &[ReverseDependency]) -> Option<&ReverseDependency> {
    entries
        .iter()
        .filter(|e| e.listed)
        .max_by(|a, b| a.dependent_version.cmp(&b.dependent_version))
        .or_else(|| {
            entries
                .iter()
                .max_by(|a, b| a.dependent_version.cmp(&b.dependent_version))
        })
}

/// Collapse entries to one result per dependent id, ordered by id
/// (case-insensitive, ascending). Entries for `target` itself are ignored.
pub fn resolve_dependents(
    target: &PackageId,
    entries: Vec<ReverseDependency>,
) -> Vec<DependentResult> {
    let mut groups: BTreeMap<PackageId, Vec<ReverseDependency>> = BTreeMap::new();
    for entry in entries {
        if &entry.dependent_id == target {
            continue;
        }
        groups.entry(entry.dependent_id.clone()).or_default().push(entry);
    }

    groups
        .values()
        .filter_map(|group| select_representative(group))
        .map(|entry| DependentResult {
            id: entry.dependent_id.clone(),
            version: entry.dependent_version.clone(),
            listed: entry.listed,
            description: entry.description.clone(),
            range: entry.range.clone(),
        })
        .collect()
}

/// Distinct dependent ids in the order they first appear.
pub(crate) fn distinct_ids(entries: &[ReverseDependency]) -> Vec<PackageId> {
    let mut seen: HashSet<&PackageId> = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .filter(|entry| seen.insert(&entry.dependent_id))
        .map(|entry| entry.dependent_id.clone())
        .collect()
}
