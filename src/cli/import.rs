use std::path::Path;

use chrono::Utc;

use crate::snapshot::{Snapshot, import_snapshot};

use super::{CommonArgs, init_store, load_config};

pub fn run_import(common: &CommonArgs, file: &Path) -> anyhow::Result<()> {
    let config = load_config(common)?;
    let store = init_store(&config)?;

    let snapshot = Snapshot::load(file)?;
    let report = import_snapshot(
        &store,
        &snapshot,
        &config.package_managers.legacy,
        Utc::now(),
    )?;

    println!();
    println!("Imported {}", file.display());
    println!("Package managers: {}", report.package_managers);
    println!("Packages:         {}", report.packages);
    println!("URLs:             {}", report.urls);
    println!("Dependencies:     {}", report.dependencies);
    println!();

    Ok(())
}
