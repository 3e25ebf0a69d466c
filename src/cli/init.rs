use std::fs;

use chrono::Utc;

use crate::snapshot::ensure_package_manager;
use crate::store::{SqliteStore, Store};

use super::{CommonArgs, load_config};

pub fn run_init(common: &CommonArgs) -> anyhow::Result<()> {
    let config = load_config(common)?;
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let now = Utc::now();
    let mut registered = Vec::new();
    for name in &config.package_managers.known {
        let (_, created) = ensure_package_manager(&store, name, now)?;
        if created {
            registered.push(name.as_str());
        }
    }

    println!();
    println!("Initialized database at {}", config.db_path().display());
    if registered.is_empty() {
        println!("All package managers already registered");
    } else {
        println!("Registered package managers: {}", registered.join(", "));
    }
    println!();

    Ok(())
}
