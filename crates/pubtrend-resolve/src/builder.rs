//! E-utilities boolean query construction.
//!
//! The returned string is sent to the search endpoint verbatim and is also
//! surfaced to end users for display and audit, so its exact shape is a
//! correctness requirement: users paste it back into the external search
//! service to verify results.
//!
//! Date clauses use `[pdat]` ranges. The service grammar requires both sides
//! of a range, so an open bound substitutes the conventional sentinel
//! (`1800` for the past, `3000` for the future); a window open on both sides
//! omits the date clause entirely.

use pubtrend_common::YearWindow;

use crate::request::SearchRequest;
use crate::resolver::ResolvedTerm;

const OPEN_START_SENTINEL: i32 = 1800;
const OPEN_END_SENTINEL: i32 = 3000;

/// `(start:end[pdat])`, sentinel-filled on open bounds, `None` when the
/// window is unbounded on both sides.
fn date_clause(window: &YearWindow) -> Option<String> {
    match (window.start, window.end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "({}:{}[pdat])",
            start.unwrap_or(OPEN_START_SENTINEL),
            end.unwrap_or(OPEN_END_SENTINEL)
        )),
    }
}

/// The name group for one resolved term. A manufacturer shows up in
/// publication metadata as an affiliation or a funding body, so the name is
/// searched under all three field tags.
fn name_group(name: &str) -> String {
    format!(
        "(\"{name}\"[Affiliation] OR \"{name}\"[Grant Number] OR \"{name}\"[Grant])"
    )
}

/// One term clause: name group AND its effective date window.
fn term_clause(term: &ResolvedTerm) -> String {
    match date_clause(&term.window) {
        Some(dates) => format!("({} AND {})", name_group(&term.name), dates),
        None => name_group(&term.name),
    }
}

/// Compose the full boolean query for one manufacturer's resolved terms.
///
/// Term clauses OR-combine; topic and every advanced filter AND-combine with
/// the result. The field scope wraps only the topic clause. With no resolved
/// terms (a plain topic search) the request's own date range applies instead
/// of per-term windows.
pub fn build_query(request: &SearchRequest, terms: &[ResolvedTerm]) -> String {
    let mut parts: Vec<String> = Vec::new();

    let topic = request.topic.trim();
    if !topic.is_empty() {
        parts.push(format!("({}{})", topic, request.filters.scope.tag()));
    }

    if !terms.is_empty() {
        let clauses: Vec<String> = terms.iter().map(term_clause).collect();
        parts.push(format!("({})", clauses.join(" OR ")));
    }

    if let Some(grant) = request
        .filters
        .grant_number
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
    {
        parts.push(format!("{grant}[Grant Number]"));
    }

    if let Some(pub_type) = request
        .filters
        .publication_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        parts.push(format!("{pub_type}[Publication Type]"));
    }

    let mesh: Vec<String> = request
        .filters
        .mesh_terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("{t}[MeSH Terms]"))
        .collect();
    if !mesh.is_empty() {
        parts.push(format!("({})", mesh.join(" AND ")));
    }

    // A topic-only search still has to honor the requested range.
    if terms.is_empty() {
        if let Some(dates) = date_clause(&request.range) {
            parts.push(dates);
        }
    }

    parts.join(" AND ")
}
