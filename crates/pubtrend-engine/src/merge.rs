//! Manufacturer-level merging.
//!
//! A manufacturer's publications arrive split across its resolved terms.
//! Within one identity the resolved windows for a name never overlap, so a
//! publication year receives contributions from at most one term and
//! per-year sums are safe.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use pubtrend_common::YearWindow;

use crate::aggregate::{sampling_percentage, top_n, SampleResult, TopEntry};
use crate::pipeline::ManufacturerReport;

fn merge_tallies(lists: Vec<&[TopEntry]>) -> Vec<TopEntry> {
    let mut tally: HashMap<String, u64> = HashMap::new();
    for list in lists {
        for entry in list {
            *tally.entry(entry.name.clone()).or_insert(0) += entry.count;
        }
    }
    top_n(tally)
}

/// Combine per-term results into one manufacturer result: totals and samples
/// sum, year buckets sum per year, tallies merge by key before re-truncating,
/// and the coverage percentage is recomputed from the summed values rather
/// than averaged.
pub fn merge_terms(term_results: &[SampleResult]) -> SampleResult {
    let total_results: u64 = term_results.iter().map(|r| r.total_results).sum();
    let sampled_results: u64 = term_results.iter().map(|r| r.sampled_results).sum();

    let mut year_counts: BTreeMap<i32, u64> = BTreeMap::new();
    for result in term_results {
        for (year, count) in &result.year_counts {
            *year_counts.entry(*year).or_insert(0) += count;
        }
    }

    SampleResult {
        total_results,
        sampled_results,
        sampling_percentage: sampling_percentage(sampled_results, total_results),
        year_counts,
        top_authors: merge_tallies(term_results.iter().map(|r| r.top_authors.as_slice()).collect()),
        top_journals: merge_tallies(term_results.iter().map(|r| r.top_journals.as_slice()).collect()),
        top_affiliations: merge_tallies(
            term_results.iter().map(|r| r.top_affiliations.as_slice()).collect(),
        ),
        top_grants: merge_tallies(term_results.iter().map(|r| r.top_grants.as_slice()).collect()),
        top_mesh_terms: merge_tallies(
            term_results.iter().map(|r| r.top_mesh_terms.as_slice()).collect(),
        ),
    }
}

/// Combined multi-manufacturer year table for charting. Row order follows
/// the report order (already `display_order`); year order is ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearSeries {
    pub years: Vec<i32>,
    pub manufacturers: Vec<String>,
    /// Per-year counts aligned with `manufacturers`.
    pub counts: BTreeMap<i32, Vec<u64>>,
    pub totals_by_year: BTreeMap<i32, u64>,
    pub totals_by_manufacturer: Vec<u64>,
}

/// Build the combined series. A range bounded on both sides enumerates every
/// year in it (zero rows included); an open range covers the years actually
/// observed.
pub fn combine_series(reports: &[ManufacturerReport], range: YearWindow) -> YearSeries {
    let years: Vec<i32> = match (range.start, range.end) {
        (Some(start), Some(end)) if start <= end => (start..=end).collect(),
        _ => {
            let mut observed: Vec<i32> = reports
                .iter()
                .flat_map(|r| r.result.year_counts.keys().copied())
                .collect();
            observed.sort_unstable();
            observed.dedup();
            observed
        }
    };

    let manufacturers: Vec<String> = reports.iter().map(|r| r.manufacturer.clone()).collect();
    let mut counts: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
    let mut totals_by_year: BTreeMap<i32, u64> = BTreeMap::new();
    let mut totals_by_manufacturer = vec![0u64; reports.len()];

    for &year in &years {
        let row: Vec<u64> = reports
            .iter()
            .map(|r| r.result.year_counts.get(&year).copied().unwrap_or(0))
            .collect();
        for (i, count) in row.iter().enumerate() {
            totals_by_manufacturer[i] += count;
        }
        totals_by_year.insert(year, row.iter().sum());
        counts.insert(year, row);
    }

    YearSeries {
        years,
        manufacturers,
        counts,
        totals_by_year,
        totals_by_manufacturer,
    }
}
