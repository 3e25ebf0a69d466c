use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::url::is_canonical_url;
use crate::types::{Canon, CanonMapping, CanonPackage, MappingUpdate, Package, Url};

/// A package whose latest homepage is not in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedHomepage {
    pub package_id: String,
    pub url_id: String,
    pub url: String,
}

#[derive(Debug, Default)]
pub struct LatestHomepages {
    /// Latest canonical homepage per package, keyed by package id.
    pub homepages: BTreeMap<String, Url>,
    pub rejected: Vec<RejectedHomepage>,
}

/// Keeps the first homepage seen per package.
///
/// Rows must be ordered by package, then URL creation time descending, so the
/// first row is the package's latest homepage. A non-canonical latest homepage
/// excludes the package; older URLs are not consulted.
pub fn latest_homepage_per_package(rows: Vec<(Package, Url)>) -> LatestHomepages {
    let mut seen = HashSet::new();
    let mut latest = LatestHomepages::default();

    for (package, url) in rows {
        if !seen.insert(package.id.clone()) {
            continue;
        }
        if !is_canonical_url(&url.url) {
            tracing::warn!("{}: {} is not canonicalized, skipping package {}", url.id, url.url, package.id);
            latest.rejected.push(RejectedHomepage {
                package_id: package.id,
                url_id: url.id,
                url: url.url,
            });
            continue;
        }
        latest.homepages.insert(package.id, url);
    }

    latest
}

/// Changes that bring canon state in line with the latest homepages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub new_canons: Vec<Canon>,
    pub new_mappings: Vec<CanonPackage>,
    pub updated_mappings: Vec<MappingUpdate>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.new_canons.is_empty() && self.new_mappings.is_empty() && self.updated_mappings.is_empty()
    }
}

/// Computes the minimal set of canon and mapping writes for `latest_homepages`.
///
/// Packages are visited in key order. A canon created for a URL earlier in the
/// batch is reused by later packages sharing that URL, so one URL never yields
/// two canons. Applying the result and reconciling again yields no changes.
pub fn reconcile(
    latest_homepages: &BTreeMap<String, Url>,
    current_canons: &HashMap<String, Canon>,
    current_mappings: &HashMap<String, CanonMapping>,
    now: DateTime<Utc>,
) -> Reconciliation {
    let mut changes = Reconciliation::default();
    let mut created_by_url: HashMap<&str, usize> = HashMap::new();

    for (package_id, url) in latest_homepages {
        let actual_canon_id = current_canons
            .get(&url.id)
            .map(|canon| canon.id.clone())
            .or_else(|| {
                created_by_url
                    .get(url.id.as_str())
                    .map(|&i| changes.new_canons[i].id.clone())
            });
        let linked = current_mappings.get(package_id);

        let canon_id = match actual_canon_id {
            Some(canon_id) => canon_id,
            None => {
                let canon = Canon {
                    id: Uuid::new_v4().to_string(),
                    url_id: url.id.clone(),
                    name: url.url.clone(),
                    created_at: now,
                    updated_at: now,
                };
                let canon_id = canon.id.clone();
                created_by_url.insert(url.id.as_str(), changes.new_canons.len());
                changes.new_canons.push(canon);
                canon_id
            }
        };

        match linked {
            None => changes.new_mappings.push(CanonPackage {
                id: Uuid::new_v4().to_string(),
                canon_id,
                package_id: package_id.clone(),
                created_at: now,
                updated_at: now,
            }),
            Some(mapping) if mapping.canon_id != canon_id => {
                changes.updated_mappings.push(MappingUpdate {
                    mapping_id: mapping.id.clone(),
                    package_id: package_id.clone(),
                    canon_id,
                    updated_at: now,
                });
            }
            Some(_) => {}
        }
    }

    changes
}
