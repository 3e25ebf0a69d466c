use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use rust_decimal::Decimal;

use super::Store;
use super::schema::SCHEMA;
use crate::dedupe::Reconciliation;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed width so that text order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn url_type_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<UrlType> {
    let text: String = row.get(idx)?;
    UrlType::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_package(row: &Row<'_>, offset: usize) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        package_manager_id: row.get(offset + 2)?,
        import_id: row.get(offset + 3)?,
        created_at: parse_datetime(&row.get::<_, String>(offset + 4)?),
        updated_at: parse_datetime(&row.get::<_, String>(offset + 5)?),
    })
}

fn row_to_url(row: &Row<'_>, offset: usize) -> rusqlite::Result<Url> {
    Ok(Url {
        id: row.get(offset)?,
        url: row.get(offset + 1)?,
        url_type: url_type_column(row, offset + 2)?,
        created_at: parse_datetime(&row.get::<_, String>(offset + 3)?),
    })
}

fn row_to_canon(row: &Row<'_>) -> rusqlite::Result<Canon> {
    Ok(Canon {
        id: row.get(0)?,
        url_id: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn row_to_rank_run(row: &Row<'_>) -> rusqlite::Result<TeaRankRun> {
    Ok(TeaRankRun {
        id: row.get(0)?,
        run: row.get(1)?,
        split_ratio: decimal_column(row, 2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn write_canons(conn: &Connection, canons: &[Canon]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO canons (id, url_id, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(url_id) DO NOTHING",
    )?;
    for canon in canons {
        stmt.execute(params![
            canon.id,
            canon.url_id,
            canon.name,
            format_datetime(&canon.created_at),
            format_datetime(&canon.updated_at),
        ])?;
    }
    Ok(())
}

fn write_mappings(conn: &Connection, create: &[CanonPackage], update: &[MappingUpdate]) -> Result<()> {
    let mut insert = conn.prepare(
        "INSERT INTO canon_packages (id, canon_id, package_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(package_id) DO UPDATE SET
             canon_id = excluded.canon_id,
             updated_at = excluded.updated_at",
    )?;
    for mapping in create {
        insert.execute(params![
            mapping.id,
            mapping.canon_id,
            mapping.package_id,
            format_datetime(&mapping.created_at),
            format_datetime(&mapping.updated_at),
        ])?;
    }

    let mut modify =
        conn.prepare("UPDATE canon_packages SET canon_id = ?1, updated_at = ?2 WHERE id = ?3")?;
    for mapping in update {
        let rows = modify.execute(params![
            mapping.canon_id,
            format_datetime(&mapping.updated_at),
            mapping.mapping_id,
        ])?;
        if rows == 0 {
            return Err(Error::MissingMapping(mapping.mapping_id.clone()));
        }
    }
    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Package manager registry

    fn create_package_manager(&self, pm: &PackageManager) -> Result<()> {
        self.conn().execute(
            "INSERT INTO package_managers (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![pm.id, pm.name, format_datetime(&pm.created_at)],
        )?;
        Ok(())
    }

    fn get_package_manager_by_name(&self, name: &str) -> Result<Option<PackageManager>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM package_managers WHERE name = ?1",
            params![name],
            |row| {
                Ok(PackageManager {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_package_managers(&self) -> Result<Vec<PackageManager>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM package_managers ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(PackageManager {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Upstream records

    fn create_package(&self, package: &Package) -> Result<()> {
        self.conn().execute(
            "INSERT INTO packages (id, name, package_manager_id, import_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                package.id,
                package.name,
                package.package_manager_id,
                package.import_id,
                format_datetime(&package.created_at),
                format_datetime(&package.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_package_by_name(
        &self,
        package_manager_id: &str,
        name: &str,
    ) -> Result<Option<Package>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, package_manager_id, import_id, created_at, updated_at
             FROM packages WHERE package_manager_id = ?1 AND name = ?2",
            params![package_manager_id, name],
            |row| row_to_package(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn create_url(&self, url: &Url) -> Result<()> {
        self.conn().execute(
            "INSERT INTO urls (id, url, url_type, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                url.id,
                url.url,
                url.url_type.as_str(),
                format_datetime(&url.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_url(&self, url: &str, url_type: UrlType) -> Result<Option<Url>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, url, url_type, created_at FROM urls WHERE url = ?1 AND url_type = ?2",
            params![url, url_type.as_str()],
            |row| row_to_url(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn link_package_url(&self, package_id: &str, url_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO package_urls (package_id, url_id) VALUES (?1, ?2)",
            params![package_id, url_id],
        )?;
        Ok(())
    }

    fn create_version(&self, version: &Version) -> Result<()> {
        self.conn().execute(
            "INSERT INTO versions (id, package_id, version, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                version.id,
                version.package_id,
                version.version,
                format_datetime(&version.created_at),
            ],
        )?;
        Ok(())
    }

    fn create_dependency(&self, version_id: &str, dependency_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO dependencies (version_id, dependency_id) VALUES (?1, ?2)",
            params![version_id, dependency_id],
        )?;
        Ok(())
    }

    fn create_legacy_dependency(&self, package_id: &str, dependency_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO legacy_dependencies (package_id, dependency_id) VALUES (?1, ?2)",
            params![package_id, dependency_id],
        )?;
        Ok(())
    }

    // Canonicalization

    fn get_current_canons(&self) -> Result<HashMap<String, Canon>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, url_id, name, created_at, updated_at FROM canons")?;

        let rows = stmt.query_map([], row_to_canon)?;

        let mut canons = HashMap::new();
        for canon in rows {
            let canon = canon?;
            canons.insert(canon.url_id.clone(), canon);
        }
        Ok(canons)
    }

    fn get_current_canon_packages(&self) -> Result<HashMap<String, CanonMapping>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, canon_id, package_id FROM canon_packages")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(2)?,
                CanonMapping {
                    id: row.get(0)?,
                    canon_id: row.get(1)?,
                },
            ))
        })?;

        rows.collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(Error::from)
    }

    fn get_packages_with_homepages(&self) -> Result<Vec<(Package, Url)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.package_manager_id, p.import_id, p.created_at, p.updated_at,
                    u.id, u.url, u.url_type, u.created_at
             FROM packages p
             JOIN package_urls pu ON pu.package_id = p.id
             JOIN urls u ON u.id = pu.url_id
             WHERE u.url_type = ?1
             ORDER BY p.id, u.created_at DESC, u.rowid DESC",
        )?;

        let rows = stmt.query_map(params![UrlType::Homepage.as_str()], |row| {
            Ok((row_to_package(row, 0)?, row_to_url(row, 6)?))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn insert_canons(&self, canons: &[Canon]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_canons(&tx, canons)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_canon_package_mappings(
        &self,
        create: &[CanonPackage],
        update: &[MappingUpdate],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_mappings(&tx, create, update)?;
        tx.commit()?;
        Ok(())
    }

    fn apply_reconciliation(&self, changes: &Reconciliation) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        write_canons(&tx, &changes.new_canons)?;
        write_mappings(&tx, &changes.new_mappings, &changes.updated_mappings)?;

        tx.commit()?;
        tracing::debug!(
            canons = changes.new_canons.len(),
            created = changes.new_mappings.len(),
            updated = changes.updated_mappings.len(),
            "Applied reconciliation"
        );
        Ok(())
    }

    fn list_canons(&self) -> Result<Vec<Canon>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, url_id, name, created_at, updated_at FROM canons ORDER BY name, id",
        )?;

        let rows = stmt.query_map([], row_to_canon)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_canon_members(&self) -> Result<Vec<CanonMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, u.url, p.name
             FROM canon_packages cp
             JOIN canons c ON c.id = cp.canon_id
             JOIN urls u ON u.id = c.url_id
             JOIN packages p ON p.id = cp.package_id
             ORDER BY c.id, p.name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CanonMember {
                canon_id: row.get(0)?,
                canon_name: row.get(1)?,
                canon_url: row.get(2)?,
                package_name: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_canon_names(&self, updates: &[CanonNameUpdate]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for update in updates {
            let rows = tx.execute(
                "UPDATE canons SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![update.name, format_datetime(&update.updated_at), update.canon_id],
            )?;
            if rows == 0 {
                return Err(Error::NotFound);
            }
        }

        tx.commit()?;
        Ok(())
    }

    // Graph inputs

    fn get_package_to_canon_mapping(&self) -> Result<HashMap<String, String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT package_id, canon_id FROM canon_packages")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        rows.collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(Error::from)
    }

    fn get_packages_by_package_manager(
        &self,
        package_manager_ids: &[String],
    ) -> Result<Vec<PackageRef>> {
        if package_manager_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; package_manager_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, package_manager_id FROM packages
             WHERE package_manager_id IN ({placeholders}) ORDER BY id"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(package_manager_ids), |row| {
            Ok(PackageRef {
                id: row.get(0)?,
                package_manager_id: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_dependencies(&self, package_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT d.dependency_id FROM dependencies d
             WHERE d.version_id = (
                 SELECT v.id FROM versions v WHERE v.package_id = ?1
                 ORDER BY v.created_at DESC, v.rowid DESC LIMIT 1
             )
             ORDER BY d.dependency_id",
        )?;

        let rows = stmt.query_map(params![package_id], |row| row.get::<_, String>(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_legacy_dependencies(&self, package_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT dependency_id FROM legacy_dependencies
             WHERE package_id = ?1 AND dependency_id != package_id
             ORDER BY dependency_id",
        )?;

        let rows = stmt.query_map(params![package_id], |row| row.get::<_, String>(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // TeaRank runs

    fn get_latest_rank_run(&self) -> Result<Option<TeaRankRun>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, run, split_ratio, created_at FROM tea_rank_runs ORDER BY run DESC LIMIT 1",
            [],
            row_to_rank_run,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_rank_run(&self, run: i64) -> Result<Option<TeaRankRun>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, run, split_ratio, created_at FROM tea_rank_runs WHERE run = ?1",
            params![run],
            row_to_rank_run,
        )
        .optional()
        .map_err(Error::from)
    }

    fn insert_ranks(&self, ranks: &[TeaRank]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // Ranks above the last recorded run belong to a run that never finished.
        let orphaned = tx.execute(
            "DELETE FROM tea_ranks
             WHERE run > (SELECT COALESCE(MAX(run), 0) FROM tea_rank_runs)",
            [],
        )?;
        if orphaned > 0 {
            tracing::warn!(orphaned, "Discarded ranks of an unfinished run");
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tea_ranks (id, canon_id, run, rank, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for rank in ranks {
                stmt.execute(params![
                    rank.id,
                    rank.canon_id,
                    rank.run,
                    rank.rank.to_string(),
                    format_datetime(&rank.created_at),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn insert_rank_run(&self, run: &TeaRankRun) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tea_rank_runs (id, run, split_ratio, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                run.id,
                run.run,
                run.split_ratio.to_string(),
                format_datetime(&run.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_ranks(&self, run: i64) -> Result<Vec<TeaRank>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, canon_id, run, rank, created_at FROM tea_ranks WHERE run = ?1",
        )?;

        let rows = stmt.query_map(params![run], |row| {
            Ok(TeaRank {
                id: row.get(0)?,
                canon_id: row.get(1)?,
                run: row.get(2)?,
                rank: decimal_column(row, 3)?,
                created_at: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;

        // Ranks are text in the database, so order numerically here.
        let mut ranks = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        ranks.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.canon_id.cmp(&b.canon_id)));
        Ok(ranks)
    }
}
