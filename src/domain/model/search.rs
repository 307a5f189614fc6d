//! Request and response shapes for search and dependents queries.

use serde::{Deserialize, Serialize};

use super::package::PackageId;
use super::version::PackageVersion;
use crate::config::DEFAULT_TAKE;

/// The protocol-level search request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaseSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_take")]
    pub take: i64,
    #[serde(default)]
    pub include_prerelease: bool,
    #[serde(default, rename = "semVerLevel2")]
    pub include_semver2: bool,
}

/// A search request extended with structural filters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_take")]
    pub take: i64,
    #[serde(default)]
    pub include_prerelease: bool,
    #[serde(default, rename = "semVerLevel2")]
    pub include_semver2: bool,
    /// Only return packages declaring this package type.
    #[serde(default)]
    pub package_type: Option<String>,
    /// Only return packages declaring this target framework.
    #[serde(default)]
    pub framework: Option<String>,
}

fn default_take() -> i64 {
    DEFAULT_TAKE
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            skip: 0,
            take: DEFAULT_TAKE,
            include_prerelease: false,
            include_semver2: false,
            package_type: None,
            framework: None,
        }
    }
}

impl SearchRequest {
    /// Build an extended request from a protocol request.
    ///
    /// The extension filters are never derived from the base request.
    pub fn from_base(request: BaseSearchRequest) -> Self {
        Self {
            query: request.query,
            skip: request.skip,
            take: request.take,
            include_prerelease: request.include_prerelease,
            include_semver2: request.include_semver2,
            package_type: None,
            framework: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_paging(mut self, skip: i64, take: i64) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    pub fn with_package_type(mut self, package_type: impl Into<String>) -> Self {
        self.package_type = Some(package_type.into());
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }
}

/// One package in a search response.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: PackageId,
    /// Highest matching version.
    pub version: PackageVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub package_types: Vec<String>,
    pub frameworks: Vec<String>,
    /// Every matching version, highest first.
    pub versions: Vec<PackageVersion>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub total_hits: usize,
    pub data: Vec<SearchResult>,
}

/// Request for the packages that depend on `package_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependentsRequest {
    pub package_id: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_take")]
    pub take: i64,
}

impl DependentsRequest {
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            skip: 0,
            take: DEFAULT_TAKE,
        }
    }

    pub fn with_paging(mut self, skip: i64, take: i64) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }
}

/// One dependent package, represented by a single version.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependentResult {
    pub id: PackageId,
    pub version: PackageVersion,
    pub listed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The range this version declares on the requested package.
    pub range: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DependentsResponse {
    pub total_hits: usize,
    pub data: Vec<DependentResult>,
}

/// Paging window after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub take: usize,
}

impl Page {
    /// Clamp raw paging values: `skip` to at least zero, `take` into
    /// `[1, max_page_size]`.
    pub fn clamp(skip: i64, take: i64, max_page_size: usize) -> Self {
        let max = max_page_size.max(1);
        let skip = usize::try_from(skip.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(take.max(1)).unwrap_or(max).min(max);
        Self { skip, take }
    }

    /// Apply the window to an already ordered collection.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.take).collect()
    }
}

/// Normalize an optional filter: trimmed, lower-cased, `None` when blank.
pub fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}
