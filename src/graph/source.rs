use std::collections::HashSet;

use crate::error::Result;
use crate::store::Store;
use crate::types::PackageRef;

/// Reads a package's dependencies from the store, choosing between the
/// package-to-package (legacy) and version-level representations by the
/// package's package manager.
pub struct StoreDependencies<'a> {
    store: &'a dyn Store,
    legacy_package_manager_ids: HashSet<String>,
}

impl<'a> StoreDependencies<'a> {
    pub fn new(
        store: &'a dyn Store,
        legacy_package_manager_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            legacy_package_manager_ids: legacy_package_manager_ids.into_iter().collect(),
        }
    }

    pub fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<String>> {
        if self
            .legacy_package_manager_ids
            .contains(&package.package_manager_id)
        {
            self.store.get_legacy_dependencies(&package.id)
        } else {
            self.store.get_dependencies(&package.id)
        }
    }
}
