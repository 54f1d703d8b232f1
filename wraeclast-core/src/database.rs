use crate::error::{CatalogError, Result, WraeclastError};
use crate::models::{
    BossSkillStatRow, GemStatRow, NodeEffectRow, Operator, ParsedModifier, SnapshotVersion,
    SourceTable, StatDefinition, StatOverride, StoredCounts, UniqueModRow,
};
use lazy_static::lazy_static;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use std::time::Duration;

lazy_static! {
    static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![M::up(
        r#"
        -- Snapshot version registry
        CREATE TABLE snapshot_versions (
            version_id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_tag TEXT NOT NULL UNIQUE,
            fetched_at TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT ''
        );

        -- Stat template catalog
        CREATE TABLE stat_definitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stat_key TEXT NOT NULL,
            unit TEXT,
            description TEXT NOT NULL,
            param_keys TEXT NOT NULL DEFAULT '[]',
            category TEXT NOT NULL,
            version_id INTEGER NOT NULL REFERENCES snapshot_versions(version_id),
            UNIQUE(stat_key, category, version_id)
        );

        CREATE TABLE stat_overrides (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stat_key TEXT NOT NULL,
            skill_key TEXT NOT NULL,
            override_desc TEXT NOT NULL,
            override_params TEXT NOT NULL DEFAULT '[]',
            version_id INTEGER NOT NULL REFERENCES snapshot_versions(version_id),
            UNIQUE(stat_key, skill_key, version_id)
        );

        CREATE INDEX idx_stat_definitions_version ON stat_definitions(version_id, category);
        CREATE INDEX idx_stat_overrides_version ON stat_overrides(version_id, skill_key);

        -- Raw modifier origins
        CREATE TABLE unique_mods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_name TEXT,
            modifier TEXT,
            version_id INTEGER NOT NULL
        );

        CREATE TABLE gem_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            gem_name TEXT,
            stat_key TEXT,
            stat_value TEXT,
            version_id INTEGER NOT NULL
        );

        CREATE TABLE boss_skill_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            skill_id INTEGER,
            skill_key TEXT,
            stat_key TEXT,
            stat_value TEXT,
            version_id INTEGER NOT NULL
        );

        CREATE TABLE node_effects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id INTEGER,
            stat_key TEXT,
            value TEXT,
            version_id INTEGER NOT NULL
        );

        CREATE INDEX idx_unique_mods_version ON unique_mods(version_id);
        CREATE INDEX idx_gem_stats_version ON gem_stats(version_id);
        CREATE INDEX idx_boss_skill_stats_version ON boss_skill_stats(version_id);
        CREATE INDEX idx_node_effects_version ON node_effects(version_id);

        -- Normalized output. stat_key '' is the storage slot for
        -- unresolved rows: SQLite treats NULLs as distinct in UNIQUE
        -- constraints, the empty string gives one slot per source row.
        CREATE TABLE mod_parsed (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_table TEXT NOT NULL,
            source_key TEXT NOT NULL,
            raw_text TEXT NOT NULL,
            stat_key TEXT NOT NULL DEFAULT '',
            operator TEXT,
            magnitude_min REAL,
            magnitude_max REAL,
            is_range INTEGER NOT NULL DEFAULT 0,
            unit TEXT,
            ambiguous INTEGER NOT NULL DEFAULT 0,
            version_id INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(source_table, source_key, stat_key, version_id)
        );

        CREATE INDEX idx_mod_parsed_version ON mod_parsed(version_id);
        CREATE INDEX idx_mod_parsed_stat_key ON mod_parsed(stat_key);
        "#
    )]);
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(path: &std::path::Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_millis(5000))?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(WraeclastError::Pool)?;

        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(WraeclastError::Pool)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.connection()?;
        MIGRATIONS.to_latest(&mut conn)?;
        Ok(())
    }

    // Version registry

    /// Register a snapshot version, refreshing its timestamp if the tag
    /// is already known. Returns the version ID.
    pub fn register_version(&self, version_tag: &str, source: &str) -> Result<i64> {
        let conn = self.connection()?;
        let fetched_at = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO snapshot_versions (version_tag, fetched_at, source)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(version_tag) DO UPDATE SET
                fetched_at = excluded.fetched_at,
                source = excluded.source",
            params![version_tag, fetched_at, source],
        )?;

        let version_id = conn.query_row(
            "SELECT version_id FROM snapshot_versions WHERE version_tag = ?1",
            params![version_tag],
            |row| row.get(0),
        )?;
        Ok(version_id)
    }

    pub fn get_version(&self, version_tag: &str) -> Result<Option<SnapshotVersion>> {
        let conn = self.connection()?;
        let version = conn
            .query_row(
                "SELECT version_id, version_tag, fetched_at, source
                 FROM snapshot_versions WHERE version_tag = ?1",
                params![version_tag],
                |row| {
                    Ok(SnapshotVersion {
                        version_id: row.get(0)?,
                        version_tag: row.get(1)?,
                        fetched_at: row.get(2)?,
                        source: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(version)
    }

    pub fn latest_version(&self) -> Result<Option<SnapshotVersion>> {
        let conn = self.connection()?;
        let version = conn
            .query_row(
                "SELECT version_id, version_tag, fetched_at, source
                 FROM snapshot_versions ORDER BY version_id DESC LIMIT 1",
                [],
                |row| {
                    Ok(SnapshotVersion {
                        version_id: row.get(0)?,
                        version_tag: row.get(1)?,
                        fetched_at: row.get(2)?,
                        source: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(version)
    }

    // Catalog tables

    /// Upsert stat definitions. Returns the number of rows written.
    pub fn insert_stat_definitions(&self, definitions: &[StatDefinition]) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let mut written = 0;
        for def in definitions {
            let param_keys = serde_json::to_string(&def.param_keys)?;
            tx.execute(
                "INSERT INTO stat_definitions (stat_key, unit, description, param_keys, category, version_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(stat_key, category, version_id) DO UPDATE SET
                    unit = excluded.unit,
                    description = excluded.description,
                    param_keys = excluded.param_keys",
                params![
                    def.stat_key,
                    def.unit,
                    def.description,
                    param_keys,
                    def.category.as_str(),
                    def.version_id,
                ],
            )?;
            written += 1;
        }

        tx.commit()?;
        Ok(written)
    }

    /// Upsert per-skill overrides. Returns the number of rows written.
    pub fn insert_stat_overrides(&self, overrides: &[StatOverride]) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let mut written = 0;
        for ov in overrides {
            let override_params = serde_json::to_string(&ov.override_params)?;
            tx.execute(
                "INSERT INTO stat_overrides (stat_key, skill_key, override_desc, override_params, version_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(stat_key, skill_key, version_id) DO UPDATE SET
                    override_desc = excluded.override_desc,
                    override_params = excluded.override_params",
                params![
                    ov.stat_key,
                    ov.skill_key,
                    ov.override_desc,
                    override_params,
                    ov.version_id,
                ],
            )?;
            written += 1;
        }

        tx.commit()?;
        Ok(written)
    }

    pub fn load_stat_definitions(&self, version_id: i64) -> Result<Vec<StatDefinition>> {
        let conn = self.connection()?;
        let rows: Vec<(String, Option<String>, String, String, String)> = {
            let mut stmt = conn.prepare(
                "SELECT stat_key, unit, description, param_keys, category
                 FROM stat_definitions WHERE version_id = ?1
                 ORDER BY stat_key, category",
            )?;
            stmt.query_map(params![version_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut definitions = Vec::with_capacity(rows.len());
        for (stat_key, unit, description, param_keys, category) in rows {
            let category = parse_category(&stat_key, &category)?;
            let param_keys: Vec<String> = serde_json::from_str(&param_keys)?;
            definitions.push(StatDefinition {
                stat_key,
                description,
                param_keys,
                category,
                unit,
                version_id,
            });
        }
        Ok(definitions)
    }

    pub fn load_stat_overrides(&self, version_id: i64) -> Result<Vec<StatOverride>> {
        let conn = self.connection()?;
        let rows: Vec<(String, String, String, String)> = {
            let mut stmt = conn.prepare(
                "SELECT stat_key, skill_key, override_desc, override_params
                 FROM stat_overrides WHERE version_id = ?1
                 ORDER BY stat_key, skill_key",
            )?;
            stmt.query_map(params![version_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut overrides = Vec::with_capacity(rows.len());
        for (stat_key, skill_key, override_desc, override_params) in rows {
            let override_params: Vec<String> = serde_json::from_str(&override_params)?;
            overrides.push(StatOverride {
                stat_key,
                skill_key,
                override_desc,
                override_params,
                version_id,
            });
        }
        Ok(overrides)
    }

    // Raw modifier origins

    /// Insert unique item modifier lines. Returns the number inserted.
    pub fn insert_unique_mods(&self, rows: &[(String, String)], version_id: i64) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for (item_name, modifier) in rows {
            tx.execute(
                "INSERT INTO unique_mods (item_name, modifier, version_id) VALUES (?1, ?2, ?3)",
                params![item_name, modifier, version_id],
            )?;
            inserted += 1;
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Insert gem stat lines as (gem_name, stat_key, stat_value).
    pub fn insert_gem_stats(
        &self,
        rows: &[(String, String, String)],
        version_id: i64,
    ) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for (gem_name, stat_key, stat_value) in rows {
            tx.execute(
                "INSERT INTO gem_stats (gem_name, stat_key, stat_value, version_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![gem_name, stat_key, stat_value, version_id],
            )?;
            inserted += 1;
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Insert boss skill stat lines as (skill_id, skill_key, stat_key, stat_value).
    pub fn insert_boss_skill_stats(
        &self,
        rows: &[(i64, String, String, String)],
        version_id: i64,
    ) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for (skill_id, skill_key, stat_key, stat_value) in rows {
            tx.execute(
                "INSERT INTO boss_skill_stats (skill_id, skill_key, stat_key, stat_value, version_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![skill_id, skill_key, stat_key, stat_value, version_id],
            )?;
            inserted += 1;
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Insert passive node effect lines as (node_id, stat_key, value).
    pub fn insert_node_effects(
        &self,
        rows: &[(i64, String, String)],
        version_id: i64,
    ) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for (node_id, stat_key, value) in rows {
            tx.execute(
                "INSERT INTO node_effects (node_id, stat_key, value, version_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![node_id, stat_key, value, version_id],
            )?;
            inserted += 1;
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn load_unique_mod_rows(&self, version_id: i64) -> Result<Vec<UniqueModRow>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT item_name, modifier FROM unique_mods WHERE version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![version_id], |row| {
                Ok(UniqueModRow {
                    item_name: row.get(0)?,
                    modifier: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn load_gem_stat_rows(&self, version_id: i64) -> Result<Vec<GemStatRow>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT gem_name, stat_key, stat_value FROM gem_stats
             WHERE version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![version_id], |row| {
                Ok(GemStatRow {
                    gem_name: row.get(0)?,
                    stat_key: row.get(1)?,
                    stat_value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn load_boss_skill_stat_rows(&self, version_id: i64) -> Result<Vec<BossSkillStatRow>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT skill_id, skill_key, stat_key, stat_value FROM boss_skill_stats
             WHERE version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![version_id], |row| {
                Ok(BossSkillStatRow {
                    skill_id: row.get(0)?,
                    skill_key: row.get(1)?,
                    stat_key: row.get(2)?,
                    stat_value: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn load_node_effect_rows(&self, version_id: i64) -> Result<Vec<NodeEffectRow>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT node_id, stat_key, value FROM node_effects
             WHERE version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![version_id], |row| {
                Ok(NodeEffectRow {
                    node_id: row.get(0)?,
                    stat_key: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // Normalized output

    /// Upsert one resolved record on its logical key
    /// (source_table, source_key, stat_key, version_id).
    pub fn upsert_parsed_modifier(&self, record: &ParsedModifier) -> Result<()> {
        let conn = self.connection()?;
        let updated_at = chrono::Utc::now().to_rfc3339();
        let stat_key = record.stat_key.as_deref().unwrap_or("");
        let operator = record.operator.map(|op| op.as_str());

        conn.execute(
            "INSERT INTO mod_parsed (source_table, source_key, raw_text, stat_key, operator,
                                     magnitude_min, magnitude_max, is_range, unit, ambiguous,
                                     version_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(source_table, source_key, stat_key, version_id) DO UPDATE SET
                raw_text = excluded.raw_text,
                operator = excluded.operator,
                magnitude_min = excluded.magnitude_min,
                magnitude_max = excluded.magnitude_max,
                is_range = excluded.is_range,
                unit = excluded.unit,
                ambiguous = excluded.ambiguous,
                updated_at = excluded.updated_at",
            params![
                record.source_table.as_str(),
                record.source_key,
                record.raw_text,
                stat_key,
                operator,
                record.magnitude_min,
                record.magnitude_max,
                record.is_range,
                record.unit,
                record.ambiguous,
                record.version_id,
                updated_at,
            ],
        )?;
        Ok(())
    }

    /// Load every stored record for a version, in stable key order.
    pub fn load_parsed_mods(&self, version_id: i64) -> Result<Vec<ParsedModifier>> {
        let conn = self.connection()?;
        let rows: Vec<(String, String, String, String, Option<String>, Option<f64>, Option<f64>, bool, Option<String>, bool)> = {
            let mut stmt = conn.prepare(
                "SELECT source_table, source_key, raw_text, stat_key, operator,
                        magnitude_min, magnitude_max, is_range, unit, ambiguous
                 FROM mod_parsed WHERE version_id = ?1
                 ORDER BY source_table, source_key, stat_key",
            )?;
            stmt.query_map(params![version_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut records = Vec::with_capacity(rows.len());
        for (source_table, source_key, raw_text, stat_key, operator, min, max, is_range, unit, ambiguous) in rows {
            let source_table = SourceTable::parse(&source_table)
                .map_err(WraeclastError::Ingest)?;
            records.push(ParsedModifier {
                source_table,
                source_key,
                raw_text,
                stat_key: if stat_key.is_empty() { None } else { Some(stat_key) },
                operator: operator.as_deref().and_then(Operator::parse),
                magnitude_min: min,
                magnitude_max: max,
                is_range,
                unit,
                ambiguous,
                version_id,
            });
        }
        Ok(records)
    }

    /// Aggregate counts over stored records for one version.
    pub fn summarize_stored(&self, version_id: i64) -> Result<StoredCounts> {
        let conn = self.connection()?;
        let (total, resolved, ambiguous): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(stat_key != ''), 0),
                    COALESCE(SUM(ambiguous), 0)
             FROM mod_parsed WHERE version_id = ?1",
            params![version_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StoredCounts {
            total: total as usize,
            resolved: resolved as usize,
            ambiguous: ambiguous as usize,
            unresolved: (total - resolved) as usize,
        })
    }
}

fn parse_category(stat_key: &str, category: &str) -> Result<crate::models::Category> {
    crate::models::Category::parse(category).ok_or_else(|| {
        WraeclastError::Catalog(CatalogError::UnknownCategory {
            stat_key: stat_key.to_string(),
            category: category.to_string(),
        })
    })
}
