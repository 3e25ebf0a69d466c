mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::HashMap;

use crate::dedupe::Reconciliation;
use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Package manager registry
    fn create_package_manager(&self, pm: &PackageManager) -> Result<()>;
    fn get_package_manager_by_name(&self, name: &str) -> Result<Option<PackageManager>>;
    fn list_package_managers(&self) -> Result<Vec<PackageManager>>;

    // Upstream records
    fn create_package(&self, package: &Package) -> Result<()>;
    fn get_package_by_name(
        &self,
        package_manager_id: &str,
        name: &str,
    ) -> Result<Option<Package>>;
    fn create_url(&self, url: &Url) -> Result<()>;
    fn get_url(&self, url: &str, url_type: UrlType) -> Result<Option<Url>>;
    fn link_package_url(&self, package_id: &str, url_id: &str) -> Result<()>;
    fn create_version(&self, version: &Version) -> Result<()>;
    fn create_dependency(&self, version_id: &str, dependency_id: &str) -> Result<()>;
    fn create_legacy_dependency(&self, package_id: &str, dependency_id: &str) -> Result<()>;

    // Canonicalization
    /// Current canons keyed by their URL id.
    fn get_current_canons(&self) -> Result<HashMap<String, Canon>>;
    /// Current canon package rows keyed by package id.
    fn get_current_canon_packages(&self) -> Result<HashMap<String, CanonMapping>>;
    /// Every (package, homepage) pair, by package then newest homepage first.
    fn get_packages_with_homepages(&self) -> Result<Vec<(Package, Url)>>;
    fn insert_canons(&self, canons: &[Canon]) -> Result<()>;
    fn upsert_canon_package_mappings(
        &self,
        create: &[CanonPackage],
        update: &[MappingUpdate],
    ) -> Result<()>;
    /// Writes canons, new mappings and mapping updates in one transaction.
    fn apply_reconciliation(&self, changes: &Reconciliation) -> Result<()>;
    fn list_canons(&self) -> Result<Vec<Canon>>;
    fn list_canon_members(&self) -> Result<Vec<CanonMember>>;
    fn update_canon_names(&self, updates: &[CanonNameUpdate]) -> Result<()>;

    // Graph inputs
    fn get_package_to_canon_mapping(&self) -> Result<HashMap<String, String>>;
    fn get_packages_by_package_manager(
        &self,
        package_manager_ids: &[String],
    ) -> Result<Vec<PackageRef>>;
    /// Dependency package ids of the package's most recent version.
    fn get_dependencies(&self, package_id: &str) -> Result<Vec<String>>;
    /// Package-to-package dependency ids, self-edges excluded.
    fn get_legacy_dependencies(&self, package_id: &str) -> Result<Vec<String>>;

    // TeaRank runs
    fn get_latest_rank_run(&self) -> Result<Option<TeaRankRun>>;
    fn get_rank_run(&self, run: i64) -> Result<Option<TeaRankRun>>;
    /// Inserts one run's ranks, first dropping ranks left by a run that has no
    /// run record.
    fn insert_ranks(&self, ranks: &[TeaRank]) -> Result<()>;
    fn insert_rank_run(&self, run: &TeaRankRun) -> Result<()>;
    fn list_ranks(&self, run: i64) -> Result<Vec<TeaRank>>;
}
