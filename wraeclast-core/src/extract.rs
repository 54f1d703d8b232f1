//! Magnitude and operator extraction from a template match.

use crate::catalog::CatalogEntry;
use crate::config::{EngineConfig, Vocabulary};
use crate::error::ExtractError;
use crate::models::Operator;
use crate::template::{SlotCapture, TemplateMatch};
use tracing::warn;

/// Numeric fields computed for one matching candidate. Magnitudes are
/// stored unsigned; the operator carries the sign.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub operator: Option<Operator>,
    pub magnitude_min: Option<f64>,
    pub magnitude_max: Option<f64>,
    pub is_range: bool,
    pub unit: Option<String>,
}

/// The first word following a capture, with a flag for a directly
/// adjacent '%'.
fn qualifier_after(text: &str, end: usize) -> (bool, Option<&str>) {
    let rest = &text[end..];
    let (percent, rest) = match rest.strip_prefix('%') {
        Some(r) => (true, r),
        None => (false, rest),
    };
    (percent, rest.split_whitespace().next())
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

fn decide_operator(
    raw_text: &str,
    entry: &CatalogEntry,
    first: &SlotCapture,
    vocab: &Vocabulary,
) -> Operator {
    // An explicit minus wins: either captured with the number or a
    // literal dash directly before it.
    if first.text.starts_with('-') {
        return Operator::Minus;
    }
    if first.start > 0 && raw_text.as_bytes()[first.start - 1] == b'-' {
        return Operator::Minus;
    }

    let (percent_adjacent, word) = qualifier_after(raw_text, first.end);
    let word = word.map(trim_word).filter(|w| !w.is_empty());
    if let Some(word) = word {
        if vocab.is_negative(word) {
            return Operator::Minus;
        }
        if vocab.is_positive(word) {
            return Operator::Plus;
        }
    }

    // Wording like "reduced by #" keeps the qualifier away from the
    // number; the template's own literals still declare it.
    if entry
        .description
        .split_whitespace()
        .map(trim_word)
        .any(|w| vocab.is_negative(w))
    {
        return Operator::Minus;
    }

    if percent_adjacent {
        if let Some(word) = word {
            if !vocab.is_positive(word) {
                warn!(
                    stat_key = %entry.stat_key,
                    qualifier = word,
                    "unrecognized qualifier word, defaulting to '+'"
                );
            }
        }
    }

    Operator::Plus
}

/// Compute magnitudes, operator and unit for one matching candidate.
/// Failure disqualifies the candidate, never the whole row.
pub fn extract(
    raw_text: &str,
    entry: &CatalogEntry,
    matched: &TemplateMatch,
    config: &EngineConfig,
) -> std::result::Result<Extraction, ExtractError> {
    let numerics: Vec<&SlotCapture> = matched.numeric_captures().collect();

    if numerics.is_empty() {
        // A pure-qualifier match still resolves the stat key.
        return Ok(Extraction {
            operator: None,
            magnitude_min: None,
            magnitude_max: None,
            is_range: false,
            unit: entry.unit.clone(),
        });
    }

    let mut magnitudes = Vec::with_capacity(numerics.len());
    for capture in &numerics {
        let value: f64 = capture
            .text
            .parse()
            .map_err(|_| ExtractError::BadNumber(capture.text.clone()))?;
        if !value.is_finite() || value.abs() > config.extract.max_magnitude {
            return Err(ExtractError::NumericOverflow(value));
        }
        magnitudes.push(value.abs());
    }
    magnitudes.sort_by(f64::total_cmp);

    let first = numerics[0];
    let operator = decide_operator(raw_text, entry, first, &config.vocabulary);

    let unit = entry.unit.clone().or_else(|| {
        raw_text[first.end..]
            .starts_with('%')
            .then(|| "%".to_string())
    });

    Ok(Extraction {
        operator: Some(operator),
        magnitude_min: magnitudes.first().copied(),
        magnitude_max: magnitudes.last().copied(),
        is_range: magnitudes.len() > 1,
        unit,
    })
}
