use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManager {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub package_manager_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kinds of URLs attached to packages. Only homepages identify canons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    Homepage,
    Source,
    Repository,
    Documentation,
}

impl UrlType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Source => "source",
            Self::Repository => "repository",
            Self::Documentation => "documentation",
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homepage" => Ok(Self::Homepage),
            "source" => Ok(Self::Source),
            "repository" => Ok(Self::Repository),
            "documentation" => Ok(Self::Documentation),
            other => Err(Error::BadRequest(format!("unknown url type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Url {
    pub id: String,
    pub url: String,
    pub url_type: UrlType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub package_id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

/// The deduplicated identity of one real-world project, keyed by its homepage URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canon {
    pub id: String,
    pub url_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonPackage {
    pub id: String,
    pub canon_id: String,
    pub package_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A package's current canon assignment as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonMapping {
    pub id: String,
    pub canon_id: String,
}

/// Re-points an existing canon package row (by its id) at another canon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingUpdate {
    pub mapping_id: String,
    pub package_id: String,
    pub canon_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonNameUpdate {
    pub canon_id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// One package attached to a canon, with what naming needs to know about both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonMember {
    pub canon_id: String,
    pub canon_name: String,
    pub canon_url: String,
    pub package_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageRef {
    pub id: String,
    pub package_manager_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeaRankRun {
    pub id: String,
    pub run: i64,
    pub split_ratio: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeaRank {
    pub id: String,
    pub canon_id: String,
    pub run: i64,
    pub rank: Decimal,
    pub created_at: DateTime<Utc>,
}
