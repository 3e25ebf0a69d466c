//! Loads already-normalized package records from a YAML snapshot.
//!
//! ```yaml
//! package_managers: [homebrew, npm]
//! packages:
//!   - name: openssl@3
//!     package_manager: homebrew
//!     homepages: [github.com/openssl/openssl]
//!     dependencies: [homebrew/ca-certificates]
//! ```
//!
//! Dependencies are written `<package manager>/<package name>`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Package, PackageManager, Url, UrlType, Version};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Snapshot {
    pub package_managers: Vec<String>,
    pub packages: Vec<SnapshotPackage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotPackage {
    pub name: String,
    pub package_manager: String,
    #[serde(default)]
    pub import_id: Option<String>,
    /// Oldest first; the last one is the current homepage.
    #[serde(default)]
    pub homepages: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Snapshot {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub package_managers: usize,
    pub packages: usize,
    pub urls: usize,
    pub dependencies: usize,
}

/// Returns the package manager called `name`, registering it if needed.
pub fn ensure_package_manager(
    store: &dyn Store,
    name: &str,
    now: DateTime<Utc>,
) -> Result<(PackageManager, bool)> {
    if let Some(pm) = store.get_package_manager_by_name(name)? {
        return Ok((pm, false));
    }
    let pm = PackageManager {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_at: now,
    };
    store.create_package_manager(&pm)?;
    debug!("Registered package manager {}", name);
    Ok((pm, true))
}

/// Writes the snapshot's records into the store.
///
/// Packages already present (same package manager and name) are reused, so
/// importing a newer snapshot adds homepages and a new current version on top
/// of the existing history. Packages of `legacy` package managers get
/// package-to-package dependencies; every other package gets one version
/// carrying its dependencies.
pub fn import_snapshot(
    store: &dyn Store,
    snapshot: &Snapshot,
    legacy: &[String],
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let legacy: HashSet<&str> = legacy.iter().map(String::as_str).collect();

    let mut package_managers: HashMap<String, PackageManager> = HashMap::new();
    for name in &snapshot.package_managers {
        let (pm, created) = ensure_package_manager(store, name, now)?;
        if created {
            report.package_managers += 1;
        }
        package_managers.insert(name.clone(), pm);
    }

    // Packages first, so dependencies may point forward.
    let mut package_ids: HashMap<(String, String), String> = HashMap::new();
    for package in &snapshot.packages {
        let pm = match package_managers.get(&package.package_manager) {
            Some(pm) => pm.clone(),
            None => {
                let pm = store
                    .get_package_manager_by_name(&package.package_manager)?
                    .ok_or_else(|| Error::UnknownPackageManager(package.package_manager.clone()))?;
                package_managers.insert(package.package_manager.clone(), pm.clone());
                pm
            }
        };

        let id = match store.get_package_by_name(&pm.id, &package.name)? {
            Some(existing) => existing.id,
            None => {
                let created = Package {
                    id: Uuid::new_v4().to_string(),
                    name: package.name.clone(),
                    package_manager_id: pm.id.clone(),
                    import_id: package.import_id.clone(),
                    created_at: now,
                    updated_at: now,
                };
                store.create_package(&created)?;
                report.packages += 1;
                created.id
            }
        };

        // Spread creation times so the last homepage listed is the newest.
        for (offset, homepage) in package.homepages.iter().enumerate() {
            let url = match store.get_url(homepage, UrlType::Homepage)? {
                Some(url) => url,
                None => {
                    let url = Url {
                        id: Uuid::new_v4().to_string(),
                        url: homepage.clone(),
                        url_type: UrlType::Homepage,
                        created_at: now + Duration::microseconds(offset as i64),
                    };
                    store.create_url(&url)?;
                    report.urls += 1;
                    url
                }
            };
            store.link_package_url(&id, &url.id)?;
        }

        package_ids.insert((package.package_manager.clone(), package.name.clone()), id);
    }

    for package in &snapshot.packages {
        let key = (package.package_manager.clone(), package.name.clone());
        let Some(package_id) = package_ids.get(&key) else {
            continue;
        };

        let mut dependency_ids = Vec::with_capacity(package.dependencies.len());
        for reference in &package.dependencies {
            let dependency_id = resolve_reference(store, &package_managers, &package_ids, reference)?
                .ok_or_else(|| {
                    Error::BadRequest(format!(
                        "{}/{} depends on unknown package {}",
                        package.package_manager, package.name, reference
                    ))
                })?;
            dependency_ids.push(dependency_id);
        }

        if legacy.contains(package.package_manager.as_str()) {
            for dependency_id in &dependency_ids {
                store.create_legacy_dependency(package_id, dependency_id)?;
            }
        } else {
            let version = Version {
                id: Uuid::new_v4().to_string(),
                package_id: package_id.clone(),
                version: format!("snapshot-{}", now.timestamp_micros()),
                created_at: now,
            };
            store.create_version(&version)?;
            for dependency_id in &dependency_ids {
                store.create_dependency(&version.id, dependency_id)?;
            }
        }
        report.dependencies += dependency_ids.len();
    }

    info!(
        "Imported {} package managers, {} packages, {} urls, {} dependencies",
        report.package_managers, report.packages, report.urls, report.dependencies
    );
    Ok(report)
}

fn resolve_reference(
    store: &dyn Store,
    package_managers: &HashMap<String, PackageManager>,
    package_ids: &HashMap<(String, String), String>,
    reference: &str,
) -> Result<Option<String>> {
    let Some((pm_name, name)) = reference.split_once('/') else {
        return Err(Error::BadRequest(format!(
            "dependency {reference} is not of the form <package manager>/<name>"
        )));
    };

    if let Some(id) = package_ids.get(&(pm_name.to_string(), name.to_string())) {
        return Ok(Some(id.clone()));
    }

    let pm_id = match package_managers.get(pm_name) {
        Some(pm) => pm.id.clone(),
        None => match store.get_package_manager_by_name(pm_name)? {
            Some(pm) => pm.id,
            None => return Ok(None),
        },
    };
    Ok(store.get_package_by_name(&pm_id, name)?.map(|p| p.id))
}
