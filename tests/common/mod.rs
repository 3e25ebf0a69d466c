//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use tearank::config::Config;
use tearank::snapshot::ensure_package_manager;
use tearank::store::{SqliteStore, Store};
use tearank::types::{Package, Url, UrlType, Version};

pub struct Fixture {
    pub temp_dir: TempDir,
    pub store: SqliteStore,
    pub config: Config,
    clock: DateTime<Utc>,
}

impl Fixture {
    /// Fresh database with the default package managers registered.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let store = SqliteStore::new(config.db_path()).expect("failed to open store");
        store.initialize().expect("failed to initialize store");

        let clock = Utc::now() - Duration::days(1);
        for name in &config.package_managers.known {
            ensure_package_manager(&store, name, clock).expect("failed to register");
        }

        Self {
            temp_dir,
            store,
            config,
            clock,
        }
    }

    /// Strictly increasing timestamps, so "latest" is well defined.
    pub fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::seconds(1);
        self.clock
    }

    pub fn package_manager_id(&self, name: &str) -> String {
        self.store
            .get_package_manager_by_name(name)
            .expect("lookup failed")
            .expect("package manager not registered")
            .id
    }

    pub fn package(&mut self, package_manager: &str, name: &str) -> String {
        let now = self.tick();
        let package = Package {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            package_manager_id: self.package_manager_id(package_manager),
            import_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_package(&package).expect("create package");
        package.id
    }

    /// Attaches `url` as the package's newest homepage.
    pub fn homepage(&mut self, package_id: &str, url: &str) -> String {
        let url = match self.store.get_url(url, UrlType::Homepage).expect("lookup url") {
            Some(existing) => existing,
            None => {
                let created = Url {
                    id: Uuid::new_v4().to_string(),
                    url: url.to_string(),
                    url_type: UrlType::Homepage,
                    created_at: self.tick(),
                };
                self.store.create_url(&created).expect("create url");
                created
            }
        };
        self.store
            .link_package_url(package_id, &url.id)
            .expect("link url");
        url.id
    }

    /// Package with a homepage in one call.
    pub fn project(&mut self, package_manager: &str, name: &str, url: &str) -> String {
        let id = self.package(package_manager, name);
        self.homepage(&id, url);
        id
    }

    /// Adds a new current version of `package_id` depending on `dependencies`.
    pub fn version(&mut self, package_id: &str, dependencies: &[&str]) -> String {
        let version = Version {
            id: Uuid::new_v4().to_string(),
            package_id: package_id.to_string(),
            version: Uuid::new_v4().to_string(),
            created_at: self.tick(),
        };
        self.store.create_version(&version).expect("create version");
        for dependency in dependencies {
            self.store
                .create_dependency(&version.id, dependency)
                .expect("create dependency");
        }
        version.id
    }

    pub fn legacy(&self, package_id: &str, dependencies: &[&str]) {
        for dependency in dependencies {
            self.store
                .create_legacy_dependency(package_id, dependency)
                .expect("create legacy dependency");
        }
    }
}
