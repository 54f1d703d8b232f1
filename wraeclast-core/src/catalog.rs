//! Stat template catalog: every definition and per-skill override for
//! one snapshot version, compiled once and shared read-only.

use crate::database::Database;
use crate::error::Result;
use crate::models::{Category, StatDefinition, StatOverride};
use crate::template::CompiledTemplate;
use std::collections::HashMap;
use tracing::{info, warn};

/// One matchable catalog entry. Overrides are reachable only through
/// their skill key; definitions through their category.
#[derive(Debug)]
pub struct CatalogEntry {
    pub stat_key: String,
    pub category: Category,
    pub unit: Option<String>,
    /// Normalized description text, kept for qualifier-word scanning.
    pub description: String,
    pub template: CompiledTemplate,
    pub is_override: bool,
}

/// Immutable template catalog for one snapshot version. Building it
/// compiles every description; any malformed template aborts the build
/// before a single modifier is processed.
#[derive(Debug)]
pub struct Catalog {
    version_id: i64,
    by_category: HashMap<Category, Vec<CatalogEntry>>,
    overrides_by_skill: HashMap<String, Vec<CatalogEntry>>,
}

impl Catalog {
    pub fn build(db: &Database, version_id: i64) -> Result<Catalog> {
        let definitions = db.load_stat_definitions(version_id)?;
        let overrides = db.load_stat_overrides(version_id)?;
        Self::from_rows(version_id, &definitions, &overrides)
    }

    /// Build directly from already-loaded rows.
    pub fn from_rows(
        version_id: i64,
        definitions: &[StatDefinition],
        overrides: &[StatOverride],
    ) -> Result<Catalog> {
        let mut by_category: HashMap<Category, Vec<CatalogEntry>> = HashMap::new();
        let mut definition_count = 0;

        for def in definitions {
            let description = crate::template::normalize_text(&def.description);
            let template =
                CompiledTemplate::compile(&def.stat_key, &def.description, &def.param_keys)?;
            by_category.entry(def.category).or_default().push(CatalogEntry {
                stat_key: def.stat_key.clone(),
                category: def.category,
                unit: def.unit.clone(),
                description,
                template,
                is_override: false,
            });
            definition_count += 1;
        }

        // Override entries inherit the unit and category of the first
        // definition carrying the same stat key, in load order.
        let unit_of: HashMap<&str, (Option<String>, Category)> = definitions
            .iter()
            .map(|d| (d.stat_key.as_str(), (d.unit.clone(), d.category)))
            .collect();

        let mut overrides_by_skill: HashMap<String, Vec<CatalogEntry>> = HashMap::new();
        let mut override_count = 0;

        for ov in overrides {
            let description = crate::template::normalize_text(&ov.override_desc);
            let template =
                CompiledTemplate::compile(&ov.stat_key, &ov.override_desc, &ov.override_params)?;
            let (unit, category) = unit_of
                .get(ov.stat_key.as_str())
                .cloned()
                .unwrap_or((None, Category::Generic));
            overrides_by_skill
                .entry(ov.skill_key.to_ascii_lowercase())
                .or_default()
                .push(CatalogEntry {
                    stat_key: ov.stat_key.clone(),
                    category,
                    unit,
                    description,
                    template,
                    is_override: true,
                });
            override_count += 1;
        }

        if definition_count == 0 {
            warn!(version_id, "catalog has no stat definitions");
        } else {
            info!(
                version_id,
                definitions = definition_count,
                overrides = override_count,
                "catalog built"
            );
        }

        Ok(Catalog {
            version_id,
            by_category,
            overrides_by_skill,
        })
    }

    pub fn version_id(&self) -> i64 {
        self.version_id
    }

    /// Definitions registered under one category.
    pub fn candidates(&self, category: Category) -> &[CatalogEntry] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Overrides registered for a skill key (case-insensitive).
    pub fn overrides_for(&self, skill_key: &str) -> &[CatalogEntry] {
        self.overrides_by_skill
            .get(&skill_key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Definitions in every category except the excluded one, for the
    /// all-category fallback phase.
    pub fn fallback_candidates(
        &self,
        excluding: Category,
    ) -> impl Iterator<Item = &CatalogEntry> {
        Category::ALL
            .iter()
            .filter(move |c| **c != excluding)
            .flat_map(|c| self.candidates(*c).iter())
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, WraeclastError};

    fn definition(stat_key: &str, category: Category, description: &str, params: &[&str]) -> StatDefinition {
        StatDefinition {
            stat_key: stat_key.to_string(),
            description: description.to_string(),
            param_keys: params.iter().map(|s| s.to_string()).collect(),
            category,
            unit: None,
            version_id: 1,
        }
    }

    #[test]
    fn test_build_groups_definitions_by_category() {
        let defs = vec![
            definition("maximum_life", Category::Mod, "+# to maximum Life", &["value"]),
            definition("gem_level", Category::Gem, "+# to Level of Socketed Gems", &["value"]),
        ];
        let catalog = Catalog::from_rows(1, &defs, &[]).unwrap();

        assert_eq!(catalog.candidates(Category::Mod).len(), 1);
        assert_eq!(catalog.candidates(Category::Gem).len(), 1);
        assert!(catalog.candidates(Category::Boss).is_empty());
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_malformed_template_aborts_build() {
        let defs = vec![
            definition("maximum_life", Category::Mod, "+# to maximum Life", &["value"]),
            definition("broken", Category::Mod, "+# to # Life", &["value"]),
        ];
        let err = Catalog::from_rows(1, &defs, &[]).unwrap_err();
        assert!(matches!(
            err,
            WraeclastError::Catalog(CatalogError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_overrides_are_reachable_by_skill_key() {
        let defs = vec![definition(
            "fireball_damage",
            Category::Gem,
            "Deals #% more Damage",
            &["value"],
        )];
        let overrides = vec![StatOverride {
            stat_key: "fireball_damage".to_string(),
            skill_key: "fireball".to_string(),
            override_desc: "Fireball deals #% more Damage".to_string(),
            override_params: vec!["value".to_string()],
            version_id: 1,
        }];
        let catalog = Catalog::from_rows(1, &defs, &overrides).unwrap();

        let found = catalog.overrides_for("Fireball");
        assert_eq!(found.len(), 1);
        assert!(found[0].is_override);
        assert_eq!(found[0].category, Category::Gem);
        assert!(catalog.overrides_for("arc").is_empty());
    }

    #[test]
    fn test_fallback_excludes_inferred_category() {
        let defs = vec![
            definition("a", Category::Mod, "something #", &["value"]),
            definition("b", Category::Gem, "other #", &["value"]),
            definition("c", Category::Generic, "third #", &["value"]),
        ];
        let catalog = Catalog::from_rows(1, &defs, &[]).unwrap();

        let keys: Vec<&str> = catalog
            .fallback_candidates(Category::Mod)
            .map(|e| e.stat_key.as_str())
            .collect();
        assert!(keys.contains(&"b"));
        assert!(keys.contains(&"c"));
        assert!(!keys.contains(&"a"));
    }
}
