//! Index documents: the projection of a package written to the index sink.

use serde::Serialize;

use super::package::{Package, PackageId};
use super::version::PackageVersion;

/// A dependency as recorded in the index.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDependency {
    pub id: PackageId,
    pub range: String,
}

/// Lower-cased copies of the fields queries match against.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MatchKeys {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub package_types: Vec<String>,
    pub frameworks: Vec<String>,
}

/// One indexed package version, keyed by `(id, version)`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub id: PackageId,
    pub version: PackageVersion,
    pub listed: bool,
    pub prerelease: bool,
    pub semver2: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub package_types: Vec<String>,
    pub frameworks: Vec<String>,
    /// Declared dependencies, one per dependency id. Self references are dropped.
    pub dependencies: Vec<IndexedDependency>,
    pub keys: MatchKeys,
}

impl IndexDocument {
    pub fn from_package(package: &Package) -> Self {
        let mut dependencies: Vec<IndexedDependency> = Vec::new();
        for dependency in package.dependencies() {
            if dependency.id == package.id || dependencies.iter().any(|d| d.id == dependency.id) {
                continue;
            }
            dependencies.push(IndexedDependency {
                id: dependency.id.clone(),
                range: dependency.range.trim().to_string(),
            });
        }

        let lower_all = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        };

        let keys = MatchKeys {
            title: package.title.as_deref().unwrap_or_default().to_lowercase(),
            description: package
                .description
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
            tags: lower_all(&package.tags),
            package_types: lower_all(&package.package_types),
            frameworks: lower_all(&package.frameworks),
        };

        Self {
            id: package.id.clone(),
            version: package.version.clone(),
            listed: package.listed,
            prerelease: package.version.is_prerelease(),
            semver2: package.is_semver2(),
            title: package.title.clone(),
            description: package.description.clone(),
            authors: package.authors.clone(),
            tags: package.tags.clone(),
            package_types: package.package_types.clone(),
            frameworks: package.frameworks.clone(),
            dependencies,
            keys,
        }
    }

    pub fn key(&self) -> (PackageId, PackageVersion) {
        (self.id.clone(), self.version.clone())
    }

    /// Range declared on `target`, if this document depends on it.
    pub fn range_for(&self, target: &PackageId) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| &d.id == target)
            .map(|d| d.range.as_str())
    }
}
