//! pubtrend-engine — Sampled aggregation and the search pipeline.
//!
//! Orchestrates the full flow for one search request:
//!   1. Resolve each selected manufacturer's history into time-bounded terms
//!   2. Build the boolean query per term (and per manufacturer for display)
//!   3. Fetch counts and a bounded article sample per term, in parallel,
//!      under the shared rate ceiling
//!   4. Aggregate per-term samples into per-year counts and top-10 tallies
//!   5. Merge term results back into one series per canonical manufacturer
//!
//! The pipeline is non-destructive: a failed identity or term degrades its
//! own manufacturer's report and never aborts the request.

pub mod aggregate;
pub mod merge;
pub mod pipeline;

pub use aggregate::{aggregate, sample_plan, SampleResult, TopEntry, TOP_N};
pub use merge::{combine_series, merge_terms, YearSeries};
pub use pipeline::{
    run_search, ManufacturerReport, SearchOutcome, SearchProgress, SearchSettings,
    SkippedIdentity,
};
