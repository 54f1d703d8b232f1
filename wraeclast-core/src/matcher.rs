//! Candidate search: which catalog templates cover a raw modifier.

use crate::catalog::{Catalog, CatalogEntry};
use crate::models::RawModifier;
use crate::template::TemplateMatch;

/// One template that fully matched a raw modifier.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub entry: &'a CatalogEntry,
    pub matched: TemplateMatch,
}

impl<'a> Candidate<'a> {
    pub fn from_override(&self) -> bool {
        self.entry.is_override
    }
}

fn match_entries<'a>(
    entries: impl Iterator<Item = &'a CatalogEntry>,
    text: &str,
    out: &mut Vec<Candidate<'a>>,
) {
    for entry in entries {
        if let Some(matched) = entry.template.match_text(text) {
            out.push(Candidate { entry, matched });
        }
    }
}

/// Find every catalog template covering the row's text. Overrides for
/// the row's skill key and definitions in the inferred category form
/// the primary candidate set; the remaining categories are scanned only
/// when that set is empty. An empty result is a valid outcome.
pub fn find_candidates<'a>(catalog: &'a Catalog, raw: &RawModifier) -> Vec<Candidate<'a>> {
    let mut candidates = Vec::new();
    let text = raw.raw_text.as_str();

    if let Some(skill_key) = raw.skill_key.as_deref() {
        match_entries(catalog.overrides_for(skill_key).iter(), text, &mut candidates);
    }

    let inferred = raw.source_table.inferred_category();
    match_entries(catalog.candidates(inferred).iter(), text, &mut candidates);

    if candidates.is_empty() {
        match_entries(catalog.fallback_candidates(inferred), text, &mut candidates);
    }

    candidates
}
