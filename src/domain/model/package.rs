use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::version::{PackageVersion, range_mentions_semver2};

/// Deserialize a list that may be null as an empty list
fn deserialize_nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

fn default_listed() -> bool {
    true
}

/// Package identifier.
///
/// Keeps the casing it was published with but compares, orders and hashes
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct PackageId {
    original: String,
    key: String,
}

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        let original: String = id.into();
        let original = original.trim().to_string();
        let key = original.to_lowercase();
        Self { original, key }
    }

    /// The id as it was published.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Lower-cased comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_blank(&self) -> bool {
        self.key.is_empty()
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackageId {}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for PackageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PackageId::new(s))
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        PackageId::new(s)
    }
}

impl Serialize for PackageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(PackageId::new(String::deserialize(deserializer)?))
    }
}

/// A single declared dependency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub id: PackageId,
    /// Version range in interval notation; empty means any version.
    #[serde(default)]
    pub range: String,
}

/// Dependencies declared for one target framework (or for all, when
/// `target_framework` is absent).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGroup {
    #[serde(default)]
    pub target_framework: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub dependencies: Vec<Dependency>,
}

/// A published package version and its metadata.
///
/// This is also the manifest format read from catalog files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: PackageId,
    pub version: PackageVersion,
    #[serde(default = "default_listed")]
    pub listed: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub package_types: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub frameworks: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub dependency_groups: Vec<DependencyGroup>,
}

impl Package {
    /// Create a listed package with no metadata besides its identity.
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            id: PackageId::new(id),
            version,
            listed: true,
            title: None,
            description: None,
            authors: Vec::new(),
            tags: Vec::new(),
            package_types: Vec::new(),
            frameworks: Vec::new(),
            dependency_groups: Vec::new(),
        }
    }

    /// True when the version or any dependency range needs a SemVer 2.0
    /// aware client.
    pub fn is_semver2(&self) -> bool {
        self.version.is_semver2()
            || self
                .dependency_groups
                .iter()
                .flat_map(|g| g.dependencies.iter())
                .any(|d| range_mentions_semver2(&d.range))
    }

    /// All declared dependencies across groups, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependency_groups
            .iter()
            .flat_map(|g| g.dependencies.iter())
    }
}
