//! Canonicalization: merges packages that share a homepage into one canon.

pub mod naming;
mod reconcile;
pub mod url;

pub use naming::{CanonNamer, MONOREPO_THRESHOLD, ScoredNamer, plan_canon_names, score_name};
pub use reconcile::{
    LatestHomepages, Reconciliation, RejectedHomepage, latest_homepage_per_package, reconcile,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DedupeConfig;
use crate::error::Result;
use crate::store::Store;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeReport {
    pub packages_with_homepages: usize,
    pub new_canons: usize,
    pub new_mappings: usize,
    pub updated_mappings: usize,
    pub renamed_canons: usize,
    pub rejected: Vec<RejectedHomepage>,
    pub applied: bool,
}

/// Brings canons and canon packages up to date with the latest homepages.
///
/// With `config.load` unset the changes are computed and reported but nothing
/// is written, renames included.
pub fn run_dedupe(
    store: &dyn Store,
    config: &DedupeConfig,
    namer: &dyn CanonNamer,
    now: DateTime<Utc>,
) -> Result<DedupeReport> {
    info!("Starting deduplication process");

    let current_canons = store.get_current_canons()?;
    info!("Found {} current canons", current_canons.len());

    let current_mappings = store.get_current_canon_packages()?;
    info!("Found {} current canon package mappings", current_mappings.len());

    let rows = store.get_packages_with_homepages()?;
    let LatestHomepages { homepages, rejected } = latest_homepage_per_package(rows);
    info!("Found {} packages with homepages", homepages.len());

    let changes = reconcile(&homepages, &current_canons, &current_mappings, now);
    info!(
        "Reconciliation: {} new canons, {} new mappings, {} updated mappings, {} rejected homepages",
        changes.new_canons.len(),
        changes.new_mappings.len(),
        changes.updated_mappings.len(),
        rejected.len()
    );

    let mut report = DedupeReport {
        packages_with_homepages: homepages.len(),
        new_canons: changes.new_canons.len(),
        new_mappings: changes.new_mappings.len(),
        updated_mappings: changes.updated_mappings.len(),
        renamed_canons: 0,
        rejected,
        applied: false,
    };

    if !config.load {
        info!("Skipping changes, load is disabled");
        return Ok(report);
    }

    if changes.is_empty() {
        debug!("No canon changes to apply");
    } else {
        store.apply_reconciliation(&changes)?;
    }
    report.applied = true;

    if config.rename_canons {
        let members = store.list_canon_members()?;
        let renames = plan_canon_names(&members, namer, now);
        if !renames.is_empty() {
            store.update_canon_names(&renames)?;
        }
        info!("Renamed {} canons", renames.len());
        report.renamed_canons = renames.len();
    }

    info!("Deduplication process completed");
    Ok(report)
}
