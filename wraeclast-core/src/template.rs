//! Stat description templates compiled into matchable patterns.
//!
//! A template is the human-readable description of a stat with
//! placeholder markers: `#` captures a number, `@` captures free text.
//! `param_keys` names the placeholders in order. Compilation happens
//! once per catalog build; matching is a single anchored regex run.

use crate::error::CatalogError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Embedded `{tags:...}` / `{variant:...}` markers in modifier text.
    static ref MARKER: Regex = Regex::new(r"\{[^}]+\}").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Optional sign, integer or decimal.
const NUMBER_PATTERN: &str = r"([+-]?\d+(?:\.\d+)?)";
const TEXT_PATTERN: &str = r"(.+?)";

/// Normalize modifier or template text for matching: strip embedded
/// markers, fold Unicode dash variants to '-', collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let stripped = MARKER.replace_all(text, "");
    let dashed: String = stripped
        .chars()
        .map(|c| match c {
            '\u{2212}' | '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    WHITESPACE.replace_all(dashed.trim(), " ").to_string()
}

/// Placeholder kinds a template can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Numeric,
    Text,
}

/// One placeholder, in template order.
#[derive(Debug, Clone)]
pub struct Slot {
    pub kind: SlotKind,
    pub param_key: String,
}

/// Text captured by one placeholder, with byte offsets into the
/// normalized input so callers can inspect adjacent characters.
#[derive(Debug, Clone)]
pub struct SlotCapture {
    pub kind: SlotKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A successful template match.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub captures: Vec<SlotCapture>,
}

impl TemplateMatch {
    pub fn numeric_captures(&self) -> impl Iterator<Item = &SlotCapture> {
        self.captures.iter().filter(|c| c.kind == SlotKind::Numeric)
    }
}

/// A stat description compiled into an anchored case-insensitive
/// pattern. Read-only after compilation.
#[derive(Debug)]
pub struct CompiledTemplate {
    pattern: Regex,
    pub slots: Vec<Slot>,
    /// Count of literal (non-placeholder) characters in the normalized
    /// description; the disambiguator's coverage score.
    pub literal_chars: usize,
}

impl CompiledTemplate {
    /// Compile a description against its declared parameter names.
    /// The placeholder count must equal `param_keys.len()`.
    pub fn compile(
        stat_key: &str,
        description: &str,
        param_keys: &[String],
    ) -> std::result::Result<Self, CatalogError> {
        let normalized = normalize_text(description);
        if normalized.is_empty() {
            return Err(CatalogError::MalformedTemplate {
                stat_key: stat_key.to_string(),
                reason: "description is empty after normalization".to_string(),
            });
        }

        let mut body = String::new();
        let mut slots = Vec::new();
        let mut literal_run = String::new();
        let mut literal_chars = 0;

        for c in normalized.chars() {
            match c {
                '#' | '@' => {
                    if !literal_run.is_empty() {
                        body.push_str(&regex::escape(&literal_run));
                        literal_chars += literal_run.chars().count();
                        literal_run.clear();
                    }
                    let kind = if c == '#' { SlotKind::Numeric } else { SlotKind::Text };
                    let param_key = param_keys
                        .get(slots.len())
                        .cloned()
                        .unwrap_or_default();
                    slots.push(Slot { kind, param_key });
                    body.push_str(if c == '#' { NUMBER_PATTERN } else { TEXT_PATTERN });
                }
                other => literal_run.push(other),
            }
        }
        if !literal_run.is_empty() {
            body.push_str(&regex::escape(&literal_run));
            literal_chars += literal_run.chars().count();
        }

        if slots.len() != param_keys.len() {
            return Err(CatalogError::MalformedTemplate {
                stat_key: stat_key.to_string(),
                reason: format!(
                    "{} placeholders but {} param keys",
                    slots.len(),
                    param_keys.len()
                ),
            });
        }

        let pattern = Regex::new(&format!(r"(?i)^{}$", body)).map_err(|source| {
            CatalogError::Regex {
                stat_key: stat_key.to_string(),
                source,
            }
        })?;

        Ok(CompiledTemplate {
            pattern,
            slots,
            literal_chars,
        })
    }

    /// Match already-normalized modifier text. Returns None when the
    /// template does not cover the whole input.
    pub fn match_text(&self, normalized: &str) -> Option<TemplateMatch> {
        let caps = self.pattern.captures(normalized)?;
        let captures = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                // Group 0 is the whole match; slots start at group 1.
                let group = caps.get(i + 1).map(|m| (m.as_str(), m.start(), m.end()));
                let (text, start, end) = group.unwrap_or(("", 0, 0));
                SlotCapture {
                    kind: slot.kind,
                    text: text.to_string(),
                    start,
                    end,
                }
            })
            .collect();
        Some(TemplateMatch { captures })
    }
}
