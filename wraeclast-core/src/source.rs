//! Raw modifier source adapter: streams the four origin tables into a
//! uniform batch of raw modifiers.
//!
//! Unique item lines carry their text verbatim; gem, boss and node rows
//! compose "{value} {stat_key}" the way the upstream exports shape
//! them. Text is normalized once here (markers stripped, dashes folded,
//! whitespace collapsed); every later stage relies on that.

use crate::database::Database;
use crate::error::{IngestError, Result};
use crate::models::{
    BossSkillStatRow, GemStatRow, NodeEffectRow, RawModifier, SourceTable, UniqueModRow,
};
use crate::template::normalize_text;
use tracing::{info, warn};

/// One adapter pass over the origin tables.
#[derive(Debug, Default)]
pub struct RawModifierBatch {
    pub rows: Vec<RawModifier>,
    pub skipped_blank: usize,
    pub skipped_invalid: usize,
}

/// Provenance tag for override lookups: lowercased alphanumerics only,
/// so "Purity of Fire" and "purity_of_fire" both address the same key.
pub fn normalize_skill_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn compose(value: Option<&str>, stat_key: Option<&str>) -> String {
    normalize_text(&format!(
        "{} {}",
        value.unwrap_or_default(),
        stat_key.unwrap_or_default()
    ))
}

fn require_key(key: Option<&str>) -> std::result::Result<String, IngestError> {
    match key.map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ => Err(IngestError::MissingSourceKey),
    }
}

fn adapt_unique_mod(
    row: &UniqueModRow,
    version_id: i64,
) -> std::result::Result<Option<RawModifier>, IngestError> {
    let source_key = require_key(row.item_name.as_deref())?;
    let raw_text = normalize_text(row.modifier.as_deref().unwrap_or_default());
    if raw_text.is_empty() {
        return Ok(None);
    }
    Ok(Some(RawModifier {
        source_table: SourceTable::UniqueMods,
        source_key,
        raw_text,
        version_id,
        skill_key: None,
    }))
}

fn adapt_gem_stat(
    row: &GemStatRow,
    version_id: i64,
) -> std::result::Result<Option<RawModifier>, IngestError> {
    let source_key = require_key(row.gem_name.as_deref())?;
    let raw_text = compose(row.stat_value.as_deref(), row.stat_key.as_deref());
    if raw_text.is_empty() {
        return Ok(None);
    }
    let skill_key = normalize_skill_key(&source_key);
    Ok(Some(RawModifier {
        source_table: SourceTable::GemStats,
        source_key,
        raw_text,
        version_id,
        skill_key: (!skill_key.is_empty()).then_some(skill_key),
    }))
}

fn adapt_boss_skill_stat(
    row: &BossSkillStatRow,
    version_id: i64,
) -> std::result::Result<Option<RawModifier>, IngestError> {
    let skill_id = row.skill_id.ok_or(IngestError::MissingSourceKey)?;
    let raw_text = compose(row.stat_value.as_deref(), row.stat_key.as_deref());
    if raw_text.is_empty() {
        return Ok(None);
    }
    let skill_key = row
        .skill_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);
    Ok(Some(RawModifier {
        source_table: SourceTable::BossSkillStats,
        source_key: skill_id.to_string(),
        raw_text,
        version_id,
        skill_key,
    }))
}

fn adapt_node_effect(
    row: &NodeEffectRow,
    version_id: i64,
) -> std::result::Result<Option<RawModifier>, IngestError> {
    let node_id = row.node_id.ok_or(IngestError::MissingSourceKey)?;
    let raw_text = compose(row.value.as_deref(), row.stat_key.as_deref());
    if raw_text.is_empty() {
        return Ok(None);
    }
    Ok(Some(RawModifier {
        source_table: SourceTable::NodeEffects,
        source_key: node_id.to_string(),
        raw_text,
        version_id,
        skill_key: None,
    }))
}

fn collect(
    batch: &mut RawModifierBatch,
    table: SourceTable,
    adapted: std::result::Result<Option<RawModifier>, IngestError>,
) {
    match adapted {
        Ok(Some(raw)) => batch.rows.push(raw),
        Ok(None) => batch.skipped_blank += 1,
        Err(e) => {
            warn!(source_table = table.as_str(), error = %e, "source row skipped");
            batch.skipped_invalid += 1;
        }
    }
}

/// Read every origin row for a version. Each call re-reads the origin
/// tables; bad rows are counted, never fatal.
pub fn stream(db: &Database, version_id: i64) -> Result<RawModifierBatch> {
    let mut batch = RawModifierBatch::default();

    for row in db.load_unique_mod_rows(version_id)? {
        collect(
            &mut batch,
            SourceTable::UniqueMods,
            adapt_unique_mod(&row, version_id),
        );
    }
    for row in db.load_gem_stat_rows(version_id)? {
        collect(
            &mut batch,
            SourceTable::GemStats,
            adapt_gem_stat(&row, version_id),
        );
    }
    for row in db.load_boss_skill_stat_rows(version_id)? {
        collect(
            &mut batch,
            SourceTable::BossSkillStats,
            adapt_boss_skill_stat(&row, version_id),
        );
    }
    for row in db.load_node_effect_rows(version_id)? {
        collect(
            &mut batch,
            SourceTable::NodeEffects,
            adapt_node_effect(&row, version_id),
        );
    }

    info!(
        version_id,
        rows = batch.rows.len(),
        skipped_blank = batch.skipped_blank,
        skipped_invalid = batch.skipped_invalid,
        "raw modifiers streamed"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_skill_key_drops_separators() {
        assert_eq!(normalize_skill_key("Purity of Fire"), "purityoffire");
        assert_eq!(normalize_skill_key("fireball"), "fireball");
        assert_eq!(normalize_skill_key("Vaal Arc!"), "vaalarc");
    }

    #[test]
    fn test_unique_mod_text_is_used_verbatim_after_normalization() {
        let row = UniqueModRow {
            item_name: Some("Starforge".to_string()),
            modifier: Some("{tags:life}+(12\u{2013}16)  to maximum Life".to_string()),
        };
        let raw = adapt_unique_mod(&row, 1).unwrap().unwrap();
        assert_eq!(raw.raw_text, "+(12-16) to maximum Life");
        assert_eq!(raw.source_key, "Starforge");
        assert_eq!(raw.skill_key, None);
    }

    #[test]
    fn test_blank_modifier_is_skipped_not_failed() {
        let row = UniqueModRow {
            item_name: Some("Starforge".to_string()),
            modifier: Some("   ".to_string()),
        };
        assert!(adapt_unique_mod(&row, 1).unwrap().is_none());

        let marker_only = UniqueModRow {
            item_name: Some("Starforge".to_string()),
            modifier: Some("{tags:life}".to_string()),
        };
        assert!(adapt_unique_mod(&marker_only, 1).unwrap().is_none());
    }

    #[test]
    fn test_missing_source_key_fails_the_row() {
        let row = UniqueModRow {
            item_name: None,
            modifier: Some("+10 to Strength".to_string()),
        };
        assert!(matches!(
            adapt_unique_mod(&row, 1),
            Err(IngestError::MissingSourceKey)
        ));

        let empty = UniqueModRow {
            item_name: Some("  ".to_string()),
            modifier: Some("+10 to Strength".to_string()),
        };
        assert!(matches!(
            adapt_unique_mod(&empty, 1),
            Err(IngestError::MissingSourceKey)
        ));
    }

    #[test]
    fn test_gem_row_composes_value_and_stat_and_derives_skill_key() {
        let row = GemStatRow {
            gem_name: Some("Purity of Fire".to_string()),
            stat_key: Some("fire_resistance".to_string()),
            stat_value: Some("+25%".to_string()),
        };
        let raw = adapt_gem_stat(&row, 1).unwrap().unwrap();
        assert_eq!(raw.raw_text, "+25% fire_resistance");
        assert_eq!(raw.skill_key.as_deref(), Some("purityoffire"));
    }

    #[test]
    fn test_boss_row_uses_skill_id_as_source_key() {
        let row = BossSkillStatRow {
            skill_id: Some(77),
            skill_key: Some("flameblast".to_string()),
            stat_key: Some("cast_speed".to_string()),
            stat_value: Some("10".to_string()),
        };
        let raw = adapt_boss_skill_stat(&row, 1).unwrap().unwrap();
        assert_eq!(raw.source_key, "77");
        assert_eq!(raw.skill_key.as_deref(), Some("flameblast"));
        assert_eq!(raw.raw_text, "10 cast_speed");

        let missing = BossSkillStatRow {
            skill_id: None,
            skill_key: None,
            stat_key: Some("cast_speed".to_string()),
            stat_value: Some("10".to_string()),
        };
        assert!(adapt_boss_skill_stat(&missing, 1).is_err());
    }

    #[test]
    fn test_node_row_composes_and_skips_blank() {
        let row = NodeEffectRow {
            node_id: Some(4577),
            stat_key: Some("maximum_mana".to_string()),
            value: Some("30".to_string()),
        };
        let raw = adapt_node_effect(&row, 1).unwrap().unwrap();
        assert_eq!(raw.source_key, "4577");
        assert_eq!(raw.raw_text, "30 maximum_mana");

        let blank = NodeEffectRow {
            node_id: Some(4577),
            stat_key: None,
            value: None,
        };
        assert!(adapt_node_effect(&blank, 1).unwrap().is_none());
    }

    #[test]
    fn test_stream_counts_blank_and_invalid_rows() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("test.db")).unwrap();
        let version_id = db.register_version("3.26", "poe").unwrap();

        db.insert_unique_mods(
            &[
                ("Starforge".to_string(), "+50 to maximum Life".to_string()),
                ("Brightbeak".to_string(), "   ".to_string()),
            ],
            version_id,
        )
        .unwrap();
        // A row with no source key, inserted behind the typed API.
        let conn = db.connection().unwrap();
        conn.execute(
            "INSERT INTO unique_mods (item_name, modifier, version_id) VALUES (NULL, '+1 to Zeal', ?1)",
            rusqlite::params![version_id],
        )
        .unwrap();
        drop(conn);

        db.insert_node_effects(
            &[(1001, "maximum_mana".to_string(), "30".to_string())],
            version_id,
        )
        .unwrap();

        let batch = stream(&db, version_id).unwrap();
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.skipped_blank, 1);
        assert_eq!(batch.skipped_invalid, 1);

        // Another version sees none of it.
        let other = stream(&db, version_id + 5).unwrap();
        assert!(other.rows.is_empty());
    }
}
