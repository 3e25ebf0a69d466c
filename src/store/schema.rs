pub const SCHEMA: &str = r#"
-- Package managers the records were imported from
CREATE TABLE IF NOT EXISTS package_managers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    package_manager_id TEXT NOT NULL REFERENCES package_managers(id) ON DELETE CASCADE,
    import_id TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(package_manager_id, name)
);

-- URLs are shared between packages; (url, url_type) identifies one
CREATE TABLE IF NOT EXISTS urls (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    url_type TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(url, url_type)
);

CREATE TABLE IF NOT EXISTS package_urls (
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    url_id TEXT NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    PRIMARY KEY (package_id, url_id)
);

CREATE TABLE IF NOT EXISTS versions (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    version TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(package_id, version)
);

-- Version-level dependencies: a version depends on a package
CREATE TABLE IF NOT EXISTS dependencies (
    version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    dependency_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    PRIMARY KEY (version_id, dependency_id)
);

-- Package-level dependencies for package managers without version data
CREATE TABLE IF NOT EXISTS legacy_dependencies (
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    dependency_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    PRIMARY KEY (package_id, dependency_id)
);

-- One canon per homepage URL
CREATE TABLE IF NOT EXISTS canons (
    id TEXT PRIMARY KEY,
    url_id TEXT NOT NULL UNIQUE REFERENCES urls(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- A package belongs to at most one canon
CREATE TABLE IF NOT EXISTS canon_packages (
    id TEXT PRIMARY KEY,
    canon_id TEXT NOT NULL REFERENCES canons(id) ON DELETE CASCADE,
    package_id TEXT NOT NULL UNIQUE REFERENCES packages(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Append-only; a run record is written only after all of its ranks
CREATE TABLE IF NOT EXISTS tea_rank_runs (
    id TEXT PRIMARY KEY,
    run INTEGER NOT NULL UNIQUE,
    split_ratio TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Ranks are decimal text; no reference to tea_rank_runs since they land first
CREATE TABLE IF NOT EXISTS tea_ranks (
    id TEXT PRIMARY KEY,
    canon_id TEXT NOT NULL REFERENCES canons(id) ON DELETE CASCADE,
    run INTEGER NOT NULL,
    rank TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(canon_id, run)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_packages_package_manager ON packages(package_manager_id);
CREATE INDEX IF NOT EXISTS idx_package_urls_url ON package_urls(url_id);
CREATE INDEX IF NOT EXISTS idx_versions_package ON versions(package_id);
CREATE INDEX IF NOT EXISTS idx_dependencies_dependency ON dependencies(dependency_id);
CREATE INDEX IF NOT EXISTS idx_legacy_dependencies_dependency ON legacy_dependencies(dependency_id);
CREATE INDEX IF NOT EXISTS idx_canon_packages_canon ON canon_packages(canon_id);
CREATE INDEX IF NOT EXISTS idx_tea_ranks_run ON tea_ranks(run);
"#;
