//! Data models for Wraeclast modifier data.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Catalog category a stat template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Generic,
    Gem,
    Mod,
    Flask,
    Boss,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Generic,
        Category::Gem,
        Category::Mod,
        Category::Flask,
        Category::Boss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Generic => "generic",
            Category::Gem => "gem",
            Category::Mod => "mod",
            Category::Flask => "flask",
            Category::Boss => "boss",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Some(Category::Generic),
            "gem" => Some(Category::Gem),
            "mod" => Some(Category::Mod),
            "flask" => Some(Category::Flask),
            "boss" => Some(Category::Boss),
            _ => None,
        }
    }
}

/// Upstream origin table a raw modifier was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    UniqueMods,
    GemStats,
    BossSkillStats,
    NodeEffects,
}

impl SourceTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::UniqueMods => "unique_mods",
            SourceTable::GemStats => "gem_stats",
            SourceTable::BossSkillStats => "boss_skill_stats",
            SourceTable::NodeEffects => "node_effects",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, IngestError> {
        match s {
            "unique_mods" => Ok(SourceTable::UniqueMods),
            "gem_stats" => Ok(SourceTable::GemStats),
            "boss_skill_stats" => Ok(SourceTable::BossSkillStats),
            "node_effects" => Ok(SourceTable::NodeEffects),
            other => Err(IngestError::UnknownSourceTable(other.to_string())),
        }
    }

    /// Category searched before the all-category fallback.
    pub fn inferred_category(&self) -> Category {
        match self {
            SourceTable::UniqueMods => Category::Mod,
            SourceTable::GemStats => Category::Gem,
            SourceTable::BossSkillStats => Category::Boss,
            SourceTable::NodeEffects => Category::Generic,
        }
    }
}

/// Sign of a resolved modifier, stored as '+' or '-'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Plus,
    Minus,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Operator::Plus),
            "-" => Some(Operator::Minus),
            _ => None,
        }
    }
}

/// Stat template definition from the catalog tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatDefinition {
    pub stat_key: String,
    pub description: String,
    pub param_keys: Vec<String>,
    pub category: Category,
    pub unit: Option<String>,
    pub version_id: i64,
}

/// Per-skill template override; outranks the generic definition for rows
/// whose provenance carries the same skill key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatOverride {
    pub stat_key: String,
    pub skill_key: String,
    pub override_desc: String,
    pub override_params: Vec<String>,
    pub version_id: i64,
}

/// Registered snapshot version.
#[derive(Debug, Clone)]
pub struct SnapshotVersion {
    pub version_id: i64,
    pub version_tag: String,
    pub fetched_at: String, // RFC 3339
    pub source: String,
}

/// Row read from unique_mods awaiting adaptation.
#[derive(Debug, Clone)]
pub struct UniqueModRow {
    pub item_name: Option<String>,
    pub modifier: Option<String>,
}

/// Row read from gem_stats awaiting adaptation.
#[derive(Debug, Clone)]
pub struct GemStatRow {
    pub gem_name: Option<String>,
    pub stat_key: Option<String>,
    pub stat_value: Option<String>,
}

/// Row read from boss_skill_stats awaiting adaptation.
#[derive(Debug, Clone)]
pub struct BossSkillStatRow {
    pub skill_id: Option<i64>,
    pub skill_key: Option<String>,
    pub stat_key: Option<String>,
    pub stat_value: Option<String>,
}

/// Row read from node_effects awaiting adaptation.
#[derive(Debug, Clone)]
pub struct NodeEffectRow {
    pub node_id: Option<i64>,
    pub stat_key: Option<String>,
    pub value: Option<String>,
}

/// Aggregate counts over stored mod_parsed rows for one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredCounts {
    pub total: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub unresolved: usize,
}

/// One raw modifier row, normalized from its origin table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawModifier {
    pub source_table: SourceTable,
    pub source_key: String,
    pub raw_text: String,
    pub version_id: i64,
    /// Provenance tag used to look up per-skill overrides.
    pub skill_key: Option<String>,
}

/// Resolved record written to mod_parsed. An unresolved row keeps its
/// raw text and provenance with every resolution field cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedModifier {
    pub source_table: SourceTable,
    pub source_key: String,
    pub raw_text: String,
    pub stat_key: Option<String>,
    pub operator: Option<Operator>,
    pub magnitude_min: Option<f64>,
    pub magnitude_max: Option<f64>,
    pub is_range: bool,
    pub unit: Option<String>,
    pub ambiguous: bool,
    pub version_id: i64,
}

impl ParsedModifier {
    /// Unresolved record for a row no template matched.
    pub fn unresolved(raw: &RawModifier) -> Self {
        ParsedModifier {
            source_table: raw.source_table,
            source_key: raw.source_key.clone(),
            raw_text: raw.raw_text.clone(),
            stat_key: None,
            operator: None,
            magnitude_min: None,
            magnitude_max: None,
            is_range: false,
            unit: None,
            ambiguous: false,
            version_id: raw.version_id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.stat_key.is_some()
    }
}

/// Counts for one whole pass. `ambiguous` is a subset of `parsed`;
/// every source row lands in exactly one of parsed, unresolved, failed,
/// skipped_blank, skipped_invalid or unprocessed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub parsed: usize,
    pub ambiguous: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub skipped_blank: usize,
    pub skipped_invalid: usize,
    pub unprocessed: usize,
}

impl PassSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one durably written record.
    pub fn add_written(&mut self, record: &ParsedModifier) {
        if record.is_resolved() {
            self.parsed += 1;
            if record.ambiguous {
                self.ambiguous += 1;
            }
        } else {
            self.unresolved += 1;
        }
    }

    pub fn total_rows(&self) -> usize {
        self.parsed
            + self.unresolved
            + self.failed
            + self.skipped_blank
            + self.skipped_invalid
            + self.unprocessed
    }
}
