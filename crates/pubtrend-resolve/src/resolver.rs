//! Window resolver.
//!
//! Resolves one manufacturer identity against a requested year range into the
//! ordered set of (name, window) pairs to search. Windows emitted for one
//! identity never overlap for the same name, so a publication year is counted
//! under at most one term per manufacturer.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use pubtrend_common::window::merge_windows;
use pubtrend_common::{ManufacturerIdentity, Result, YearWindow};

/// A single searchable name string paired with the year window it is valid
/// for. `ord` is the declaration index inside the identity (variations first,
/// then acquisitions, implicit canonical last) and breaks ordering ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTerm {
    pub name: String,
    pub window: YearWindow,
    pub ord: usize,
}

/// Per-name window collection, keyed by the literal search string.
/// Declaration order of the first mention decides tie-breaks.
struct NameWindows {
    name: String,
    ord: usize,
    windows: Vec<YearWindow>,
}

fn push_window(entries: &mut Vec<NameWindows>, name: &str, ord: usize, window: YearWindow) {
    match entries.iter_mut().find(|e| e.name == name) {
        Some(entry) => entry.windows.push(window),
        None => entries.push(NameWindows {
            name: name.to_string(),
            ord,
            windows: vec![window],
        }),
    }
}

/// Resolve an identity against the requested range.
///
/// - Overlapping or adjacent windows of the same name merge before
///   intersection, so duplicated configuration never double-emits a term.
/// - Each acquisition adds a pre-acquisition alias for the acquired name over
///   `(-inf, year - 1]`; attribution from the acquisition year onward flows
///   through the acquirer's canonical name.
/// - The canonical name resolves over the whole requested range when the
///   identity declares no variations at all, or when it has absorbed another
///   company (the post-acquisition half has to land somewhere).
/// - Output is ordered ascending by window start, open start first, ties
///   stable by declaration order.
///
/// Gaps and overlaps in the configured windows are tolerated, never rejected;
/// only structurally invalid identities (empty names, inverted windows) error.
#[instrument(skip(identity), fields(identity = %identity.name))]
pub fn resolve(identity: &ManufacturerIdentity, requested: YearWindow) -> Result<Vec<ResolvedTerm>> {
    identity.validate()?;

    let mut entries: Vec<NameWindows> = Vec::new();

    for (i, variation) in identity.variations.iter().enumerate() {
        push_window(&mut entries, &variation.name, i, variation.window());
    }

    let acq_base = identity.variations.len();
    for (j, acquisition) in identity.acquisitions.iter().enumerate() {
        let alias = YearWindow::until(acquisition.year.saturating_sub(1));
        push_window(&mut entries, &acquisition.name, acq_base + j, alias);
    }

    if identity.variations.is_empty() || !identity.acquisitions.is_empty() {
        let canonical_ord = acq_base + identity.acquisitions.len();
        push_window(&mut entries, &identity.name, canonical_ord, YearWindow::UNBOUNDED);
    }

    let mut terms: Vec<ResolvedTerm> = Vec::new();
    for entry in entries {
        for window in merge_windows(entry.windows) {
            if let Some(effective) = window.intersect(&requested) {
                terms.push(ResolvedTerm {
                    name: entry.name.clone(),
                    window: effective,
                    ord: entry.ord,
                });
            }
        }
    }

    terms.sort_by_key(|t| (t.window.start.is_some(), t.window.start, t.ord));
    Ok(terms)
}
