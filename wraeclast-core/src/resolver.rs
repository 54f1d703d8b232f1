//! Deterministic selection among matching candidates.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::extract::{extract, Extraction};
use crate::matcher::{find_candidates, Candidate};
use crate::models::{ParsedModifier, RawModifier};
use tracing::debug;

struct Scored<'a> {
    candidate: Candidate<'a>,
    extraction: Extraction,
}

/// Resolve one raw modifier into its stored record. Pure computation:
/// never touches the store, never fails the pass. Zero surviving
/// candidates produce an unresolved record.
pub fn resolve_row(catalog: &Catalog, config: &EngineConfig, raw: &RawModifier) -> ParsedModifier {
    let mut scored: Vec<Scored> = Vec::new();
    for candidate in find_candidates(catalog, raw) {
        match extract(&raw.raw_text, candidate.entry, &candidate.matched, config) {
            Ok(extraction) => scored.push(Scored { candidate, extraction }),
            Err(e) => {
                debug!(
                    stat_key = %candidate.entry.stat_key,
                    raw_text = %raw.raw_text,
                    error = %e,
                    "candidate disqualified during extraction"
                );
            }
        }
    }

    if scored.is_empty() {
        return ParsedModifier::unresolved(raw);
    }

    // Overrides outrank definitions outright.
    if scored.iter().any(|s| s.candidate.from_override()) {
        scored.retain(|s| s.candidate.from_override());
    }

    // More than one survivor past the override rule marks the record
    // ambiguous, whatever the later rules pick.
    let ambiguous = scored.len() > 1;

    // Prefer the template covering more of the text with literals.
    let best_coverage = scored
        .iter()
        .map(|s| s.candidate.entry.template.literal_chars)
        .max()
        .unwrap_or(0);
    scored.retain(|s| s.candidate.entry.template.literal_chars == best_coverage);

    // Last resort: smallest stat key, so reruns always agree.
    let winner = scored
        .into_iter()
        .min_by(|a, b| a.candidate.entry.stat_key.cmp(&b.candidate.entry.stat_key));

    match winner {
        Some(Scored { candidate, extraction }) => ParsedModifier {
            source_table: raw.source_table,
            source_key: raw.source_key.clone(),
            raw_text: raw.raw_text.clone(),
            stat_key: Some(candidate.entry.stat_key.clone()),
            operator: extraction.operator,
            magnitude_min: extraction.magnitude_min,
            magnitude_max: extraction.magnitude_max,
            is_range: extraction.is_range,
            unit: extraction.unit,
            ambiguous,
            version_id: raw.version_id,
        },
        None => ParsedModifier::unresolved(raw),
    }
}
