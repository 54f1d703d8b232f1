//! CSV seeding for the catalog and raw origin tables.
//!
//! A seed directory holds one CSV per table, named after it:
//! `stat_definitions.csv`, `stat_overrides.csv`, `unique_mods.csv`,
//! `gem_stats.csv`, `boss_skill_stats.csv`, `node_effects.csv`.
//! `param_keys` columns hold semicolon-separated lists ("min;max").

use crate::database::Database;
use crate::error::{CatalogError, Result, WraeclastError};
use crate::file_utils::find_files_with_extension;
use crate::models::{Category, StatDefinition, StatOverride};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct DefinitionRecord {
    stat_key: String,
    category: String,
    description: String,
    #[serde(default)]
    param_keys: String,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverrideRecord {
    stat_key: String,
    skill_key: String,
    override_desc: String,
    #[serde(default)]
    override_params: String,
}

#[derive(Debug, Deserialize)]
struct UniqueModRecord {
    item_name: String,
    modifier: String,
}

#[derive(Debug, Deserialize)]
struct GemStatRecord {
    gem_name: String,
    stat_key: String,
    stat_value: String,
}

#[derive(Debug, Deserialize)]
struct BossSkillStatRecord {
    skill_id: i64,
    skill_key: String,
    stat_key: String,
    stat_value: String,
}

#[derive(Debug, Deserialize)]
struct NodeEffectRecord {
    node_id: i64,
    stat_key: String,
    value: String,
}

/// Rows written per table by one seeding call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub definitions: usize,
    pub overrides: usize,
    pub unique_mods: usize,
    pub gem_stats: usize,
    pub boss_skill_stats: usize,
    pub node_effects: usize,
}

fn split_params(field: &str) -> Vec<String> {
    field
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_unit(unit: Option<String>) -> Option<String> {
    unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

fn load_definitions(db: &Database, path: &Path, version_id: i64) -> Result<usize> {
    let records: Vec<DefinitionRecord> = read_records(path)?;
    let mut definitions = Vec::with_capacity(records.len());
    for record in records {
        let category = Category::parse(&record.category).ok_or_else(|| {
            WraeclastError::Catalog(CatalogError::UnknownCategory {
                stat_key: record.stat_key.clone(),
                category: record.category.clone(),
            })
        })?;
        definitions.push(StatDefinition {
            stat_key: record.stat_key,
            description: record.description,
            param_keys: split_params(&record.param_keys),
            category,
            unit: clean_unit(record.unit),
            version_id,
        });
    }
    db.insert_stat_definitions(&definitions)
}

fn load_overrides(db: &Database, path: &Path, version_id: i64) -> Result<usize> {
    let records: Vec<OverrideRecord> = read_records(path)?;
    let overrides: Vec<StatOverride> = records
        .into_iter()
        .map(|record| StatOverride {
            stat_key: record.stat_key,
            skill_key: record.skill_key,
            override_desc: record.override_desc,
            override_params: split_params(&record.override_params),
            version_id,
        })
        .collect();
    db.insert_stat_overrides(&overrides)
}

fn load_unique_mods(db: &Database, path: &Path, version_id: i64) -> Result<usize> {
    let records: Vec<UniqueModRecord> = read_records(path)?;
    let rows: Vec<(String, String)> = records
        .into_iter()
        .map(|r| (r.item_name, r.modifier))
        .collect();
    db.insert_unique_mods(&rows, version_id)
}

fn load_gem_stats(db: &Database, path: &Path, version_id: i64) -> Result<usize> {
    let records: Vec<GemStatRecord> = read_records(path)?;
    let rows: Vec<(String, String, String)> = records
        .into_iter()
        .map(|r| (r.gem_name, r.stat_key, r.stat_value))
        .collect();
    db.insert_gem_stats(&rows, version_id)
}

fn load_boss_skill_stats(db: &Database, path: &Path, version_id: i64) -> Result<usize> {
    let records: Vec<BossSkillStatRecord> = read_records(path)?;
    let rows: Vec<(i64, String, String, String)> = records
        .into_iter()
        .map(|r| (r.skill_id, r.skill_key, r.stat_key, r.stat_value))
        .collect();
    db.insert_boss_skill_stats(&rows, version_id)
}

fn load_node_effects(db: &Database, path: &Path, version_id: i64) -> Result<usize> {
    let records: Vec<NodeEffectRecord> = read_records(path)?;
    let rows: Vec<(i64, String, String)> = records
        .into_iter()
        .map(|r| (r.node_id, r.stat_key, r.value))
        .collect();
    db.insert_node_effects(&rows, version_id)
}

/// Seed the catalog tables from every recognized CSV in a directory.
/// `stat_definitions.csv` is required; overrides are optional.
pub fn seed_catalog_from_dir(db: &Database, dir: &Path, version_id: i64) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for path in find_files_with_extension(dir, "csv")? {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match stem {
            "stat_definitions" => report.definitions += load_definitions(db, &path, version_id)?,
            "stat_overrides" => report.overrides += load_overrides(db, &path, version_id)?,
            _ => {}
        }
    }

    if report.definitions == 0 {
        return Err(WraeclastError::NotFound(format!(
            "no stat_definitions.csv under {}",
            dir.display()
        )));
    }

    info!(
        version_id,
        definitions = report.definitions,
        overrides = report.overrides,
        "catalog seeded"
    );
    Ok(report)
}

/// Seed the raw origin tables from every recognized CSV in a directory.
/// Unrecognized CSV files are skipped with a warning.
pub fn seed_raw_from_dir(db: &Database, dir: &Path, version_id: i64) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for path in find_files_with_extension(dir, "csv")? {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match stem {
            "unique_mods" => report.unique_mods += load_unique_mods(db, &path, version_id)?,
            "gem_stats" => report.gem_stats += load_gem_stats(db, &path, version_id)?,
            "boss_skill_stats" => {
                report.boss_skill_stats += load_boss_skill_stats(db, &path, version_id)?
            }
            "node_effects" => report.node_effects += load_node_effects(db, &path, version_id)?,
            "stat_definitions" | "stat_overrides" => {}
            other => {
                warn!(file = other, "unrecognized seed CSV, skipping");
            }
        }
    }

    info!(
        version_id,
        unique_mods = report.unique_mods,
        gem_stats = report.gem_stats,
        boss_skill_stats = report.boss_skill_stats,
        node_effects = report.node_effects,
        "raw origin tables seeded"
    );
    Ok(report)
}
