//! Package versions.
//!
//! Versions are semantic versions parsed leniently the way package hosts
//! receive them (`v1.2`, `1.0.0.1`, `2.1.0-beta.1+sha.abc`). A fourth
//! numeric component is kept as a revision that orders between patch and
//! pre-release. Equality, ordering and hashing follow that precedence, so
//! build metadata never distinguishes two versions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A normalized package version.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    version: semver::Version,
    revision: u64,
}

impl PackageVersion {
    /// Parse a version string.
    ///
    /// Accepts an optional `v` prefix, missing minor/patch components
    /// (`1.2` -> `1.2.0`) and a fourth revision component (`1.2.3.4`).
    /// A zero revision is dropped (`1.2.3.0` -> `1.2.3`).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        if trimmed.is_empty() {
            bail!("Version string is empty");
        }

        let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
        let (core, suffix) = trimmed.split_at(split_at);

        let mut parts: Vec<&str> = core.split('.').collect();
        let revision = match parts.len() {
            1..=3 => 0,
            4 => {
                let revision = parts[3]
                    .parse::<u64>()
                    .with_context(|| format!("Invalid revision in version '{}'", input))?;
                parts.truncate(3);
                revision
            }
            _ => bail!("Version '{}' has too many components", input),
        };
        while parts.len() < 3 {
            parts.push("0");
        }

        let candidate = format!("{}{}", parts.join("."), suffix);
        let version = semver::Version::parse(&candidate)
            .with_context(|| format!("Invalid version '{}'", input))?;
        Ok(Self { version, revision })
    }

    /// Fourth numeric component; zero when absent.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Render the version without build metadata.
    pub fn normalized(&self) -> String {
        let v = &self.version;
        let mut rendered = format!("{}.{}.{}", v.major, v.minor, v.patch);
        if self.revision > 0 {
            rendered.push_str(&format!(".{}", self.revision));
        }
        if !v.pre.is_empty() {
            rendered.push_str(&format!("-{}", v.pre));
        }
        rendered
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// True when the version can only be understood by SemVer 2.0 aware
    /// clients: it carries build metadata or a dotted pre-release label.
    pub fn is_semver2(&self) -> bool {
        !self.version.build.is_empty() || self.version.pre.as_str().contains('.')
    }

    fn precedence_key(&self) -> (u64, u64, u64, u64, &semver::Prerelease) {
        let v = &self.version;
        (v.major, v.minor, v.patch, self.revision, &v.pre)
    }
}

/// Check whether a dependency range mentions a SemVer 2.0 version.
///
/// Ranges use interval notation (`[1.0, 2.0)`) or a bare minimum version.
/// Tokens that do not parse as versions are ignored.
pub fn range_mentions_semver2(range: &str) -> bool {
    range
        .split(|c| matches!(c, '[' | ']' | '(' | ')' | ','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| PackageVersion::parse(token).ok())
        .any(|version| version.is_semver2())
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.precedence_key() == other.precedence_key()
    }
}

impl Eq for PackageVersion {}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_key().cmp(&other.precedence_key())
    }
}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let v = &self.version;
        v.major.hash(state);
        v.minor.hash(state);
        v.patch.hash(state);
        self.revision.hash(state);
        v.pre.as_str().hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())?;
        if !self.version.build.is_empty() {
            write!(f, "+{}", self.version.build)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized())
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PackageVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}
