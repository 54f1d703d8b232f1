//! Whole-pass orchestration: catalog build, streaming, parallel
//! resolution, sequential writes, summary.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::database::Database;
use crate::error::{Result, WraeclastError};
use crate::models::{ParsedModifier, PassSummary};
use crate::writer::Writer;
use crate::{resolver, source};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::info;

/// Run one normalization pass over every raw modifier of a version.
///
/// Catalog failures abort before any row is touched; everything after
/// that is per-row and lands in the summary. Resolution is pure and
/// fans out across rayon workers; writes happen sequentially afterwards
/// so re-running a pass converges on the same stored set.
pub fn run_pass(db: &Database, config: &EngineConfig, version_id: i64) -> Result<PassSummary> {
    let started = Instant::now();
    let catalog = Catalog::build(db, version_id)?;
    let batch = source::stream(db, version_id)?;

    let mut summary = PassSummary::new();
    summary.skipped_blank = batch.skipped_blank;
    summary.skipped_invalid = batch.skipped_invalid;

    let rows = batch.rows;
    let resolve = || {
        rows.par_iter()
            .map(|raw| resolver::resolve_row(&catalog, config, raw))
            .collect::<Vec<ParsedModifier>>()
    };
    let records = match config.pass.workers {
        Some(workers) => rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| WraeclastError::Config(format!("Failed to build worker pool: {}", e)))?
            .install(resolve),
        None => resolve(),
    };

    let deadline = config
        .pass
        .deadline_secs
        .map(|secs| started + Duration::from_secs(secs));
    let writer = Writer::new(db, config.writer.clone());
    writer.write_all(&records, deadline, &mut summary);

    info!(
        version_id,
        parsed = summary.parsed,
        ambiguous = summary.ambiguous,
        unresolved = summary.unresolved,
        failed = summary.failed,
        skipped_blank = summary.skipped_blank,
        skipped_invalid = summary.skipped_invalid,
        unprocessed = summary.unprocessed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::models::{Category, Operator, SourceTable, StatDefinition, StatOverride};
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn definition(
        stat_key: &str,
        category: Category,
        description: &str,
        params: &[&str],
        version_id: i64,
    ) -> StatDefinition {
        StatDefinition {
            stat_key: stat_key.to_string(),
            description: description.to_string(),
            param_keys: params.iter().map(|s| s.to_string()).collect(),
            category,
            unit: None,
            version_id,
        }
    }

    fn seed_catalog(db: &Database, version_id: i64) {
        let defs = vec![
            definition("maximum_life", Category::Mod, "+# to maximum Life", &["value"], version_id),
            definition(
                "life_range",
                Category::Mod,
                "+(#-#) to maximum Life",
                &["min", "max"],
                version_id,
            ),
            definition(
                "fire_damage",
                Category::Generic,
                "Adds # to # Elemental Damage",
                &["min", "max"],
                version_id,
            ),
            definition(
                "cold_damage",
                Category::Generic,
                "Adds # to # Elemental Damage",
                &["min", "max"],
                version_id,
            ),
            definition(
                "gem_damage",
                Category::Gem,
                "Deals #% more Damage",
                &["value"],
                version_id,
            ),
        ];
        db.insert_stat_definitions(&defs).unwrap();

        let overrides = vec![StatOverride {
            stat_key: "fireball_damage".to_string(),
            skill_key: "fireball".to_string(),
            override_desc: "Deals #% more Damage".to_string(),
            override_params: vec!["value".to_string()],
            version_id,
        }];
        db.insert_stat_overrides(&overrides).unwrap();
    }

    #[test]
    fn test_full_pass_counts_and_stores() {
        let (_dir, db) = test_db();
        let version_id = db.register_version("3.26", "poe").unwrap();
        seed_catalog(&db, version_id);

        db.insert_unique_mods(
            &[
                ("Starforge".to_string(), "+(12-16) to maximum Life".to_string()),
                ("Oni-Goroshi".to_string(), "Adds 5 to 10 Elemental Damage".to_string()),
                ("Brightbeak".to_string(), "utter gibberish".to_string()),
                ("Shavronne's".to_string(), "  ".to_string()),
            ],
            version_id,
        )
        .unwrap();
        db.insert_gem_stats(
            &[(
                "Fireball".to_string(),
                "damage".to_string(),
                "Deals 25% more".to_string(),
            )],
            version_id,
        )
        .unwrap();

        let summary = run_pass(&db, &EngineConfig::default(), version_id).unwrap();

        // Three resolved (range, tie-broken pair, override win), one
        // unresolved, one blank.
        assert_eq!(summary.parsed, 3);
        assert_eq!(summary.ambiguous, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.skipped_blank, 1);
        assert_eq!(summary.skipped_invalid, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.unprocessed, 0);

        let stored = db.load_parsed_mods(version_id).unwrap();
        let range = stored
            .iter()
            .find(|r| r.source_key == "Starforge")
            .unwrap();
        assert_eq!(range.stat_key.as_deref(), Some("life_range"));
        assert_eq!(range.magnitude_min, Some(12.0));
        assert_eq!(range.magnitude_max, Some(16.0));
        assert!(range.is_range);

        let ambiguous = stored
            .iter()
            .find(|r| r.source_key == "Oni-Goroshi")
            .unwrap();
        assert_eq!(ambiguous.stat_key.as_deref(), Some("cold_damage"));
        assert!(ambiguous.ambiguous);

        let gem = stored.iter().find(|r| r.source_key == "Fireball").unwrap();
        assert_eq!(gem.stat_key.as_deref(), Some("fireball_damage"));
        assert_eq!(gem.operator, Some(Operator::Plus));
    }

    #[test]
    fn test_pass_is_idempotent() {
        let (_dir, db) = test_db();
        let version_id = db.register_version("3.26", "poe").unwrap();
        seed_catalog(&db, version_id);

        db.insert_unique_mods(
            &[
                ("Starforge".to_string(), "+42 to maximum Life".to_string()),
                ("Brightbeak".to_string(), "gibberish".to_string()),
            ],
            version_id,
        )
        .unwrap();
        db.insert_node_effects(
            &[(4577, "to maximum Life".to_string(), "+30".to_string())],
            version_id,
        )
        .unwrap();

        let config = EngineConfig::default();
        let first = run_pass(&db, &config, version_id).unwrap();
        let stored_first = db.load_parsed_mods(version_id).unwrap();

        let second = run_pass(&db, &config, version_id).unwrap();
        let stored_second = db.load_parsed_mods(version_id).unwrap();

        assert_eq!(first, second);
        assert_eq!(stored_first, stored_second);
        assert_eq!(stored_first.len(), 3);
    }

    #[test]
    fn test_malformed_template_aborts_before_any_write() {
        let (_dir, db) = test_db();
        let version_id = db.register_version("3.26", "poe").unwrap();
        db.insert_stat_definitions(&[definition(
            "broken",
            Category::Mod,
            "+# to # Life",
            &["value"],
            version_id,
        )])
        .unwrap();
        db.insert_unique_mods(
            &[("Starforge".to_string(), "+42 to maximum Life".to_string())],
            version_id,
        )
        .unwrap();

        let err = run_pass(&db, &EngineConfig::default(), version_id).unwrap_err();
        assert!(matches!(
            err,
            WraeclastError::Catalog(CatalogError::MalformedTemplate { .. })
        ));
        assert_eq!(db.summarize_stored(version_id).unwrap().total, 0);
    }

    #[test]
    fn test_zero_deadline_leaves_rows_unprocessed() {
        let (_dir, db) = test_db();
        let version_id = db.register_version("3.26", "poe").unwrap();
        seed_catalog(&db, version_id);
        db.insert_unique_mods(
            &[
                ("Starforge".to_string(), "+42 to maximum Life".to_string()),
                ("Brightbeak".to_string(), "+7 to maximum Life".to_string()),
            ],
            version_id,
        )
        .unwrap();

        let mut config = EngineConfig::default();
        config.pass.deadline_secs = Some(0);

        let summary = run_pass(&db, &config, version_id).unwrap();
        assert_eq!(summary.unprocessed, 2);
        assert_eq!(summary.parsed, 0);
        assert_eq!(db.summarize_stored(version_id).unwrap().total, 0);
    }

    #[test]
    fn test_configured_worker_count_is_honored() {
        let (_dir, db) = test_db();
        let version_id = db.register_version("3.26", "poe").unwrap();
        seed_catalog(&db, version_id);
        db.insert_unique_mods(
            &[("Starforge".to_string(), "+42 to maximum Life".to_string())],
            version_id,
        )
        .unwrap();

        let mut config = EngineConfig::default();
        config.pass.workers = Some(2);

        let summary = run_pass(&db, &config, version_id).unwrap();
        assert_eq!(summary.parsed, 1);
    }

    #[test]
    fn test_empty_catalog_marks_rows_unresolved() {
        let (_dir, db) = test_db();
        let version_id = db.register_version("3.26", "poe").unwrap();
        db.insert_unique_mods(
            &[("Starforge".to_string(), "+42 to maximum Life".to_string())],
            version_id,
        )
        .unwrap();

        let summary = run_pass(&db, &EngineConfig::default(), version_id).unwrap();
        assert_eq!(summary.parsed, 0);
        assert_eq!(summary.unresolved, 1);

        let stored = db.load_parsed_mods(version_id).unwrap();
        assert_eq!(stored[0].stat_key, None);
        assert_eq!(stored[0].raw_text, "+42 to maximum Life");
    }
}
