//! End-to-end search pipeline.
//!
//! Orchestrates the full flow for one request:
//!   1. Validate identities (bad ones are skipped, not fatal)
//!   2. Resolve each manufacturer's history against the requested range
//!   3. Fetch count + bounded sample per resolved term, all terms and all
//!      manufacturers in parallel under the shared rate ceiling
//!   4. Aggregate and merge back to one result per manufacturer
//!   5. Emit progress events via broadcast channel
//!
//! Failure containment: a term that exhausts retries degrades its own
//! manufacturer; a request deadline marks incomplete manufacturers partial;
//! nothing aborts sibling manufacturers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use pubtrend_common::{ManufacturerIdentity, PubtrendError};
use pubtrend_ingestion::PublicationSource;
use pubtrend_resolve::{build_query, resolve, ResolvedTerm, SearchRequest};

use crate::aggregate::{aggregate, sample_plan, SampleResult};
use crate::merge::{combine_series, merge_terms, YearSeries};

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Page size per search call, also the summary-fetch chunk size ceiling.
    pub results_per_call: usize,
    /// Upper bound on articles sampled per term.
    pub max_samples: usize,
    /// Overall request deadline. In-flight fetches past it are abandoned and
    /// the affected manufacturers reported partial.
    pub timeout: Option<Duration>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            results_per_call: 100,
            max_samples: 10_000,
            timeout: None,
        }
    }
}

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a pipeline run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct SearchProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub message: String,
    pub manufacturers_done: usize,
    pub manufacturers_total: usize,
    pub error: Option<String>,
}

fn emit(
    tx: &Option<broadcast::Sender<SearchProgress>>,
    job_id: Uuid,
    stage: &str,
    message: String,
    done: usize,
    total: usize,
) {
    if let Some(tx) = tx {
        let _ = tx.send(SearchProgress {
            job_id,
            stage: stage.to_string(),
            message,
            manufacturers_done: done,
            manufacturers_total: total,
            error: None,
        });
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// One manufacturer's aggregated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerReport {
    pub manufacturer: String,
    pub color: Option<String>,
    pub display_order: u32,
    /// The full boolean query for this manufacturer, returned verbatim for
    /// display and audit.
    pub query: String,
    pub terms: Vec<ResolvedTerm>,
    pub result: SampleResult,
    /// One or more term fetches failed; their counts are excluded.
    pub degraded: bool,
    /// The request deadline cut this manufacturer short.
    pub partial: bool,
    pub failed_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedIdentity {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub job_id: Uuid,
    /// Ordered by display_order, ties by declaration order.
    pub reports: Vec<ManufacturerReport>,
    pub series: YearSeries,
    /// Identities rejected by validation, with the reason.
    pub skipped: Vec<SkippedIdentity>,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
}

// ── Per-term fetch ────────────────────────────────────────────────────────────

enum TermOutcome {
    Sampled(SampleResult),
    Failed { term: String, error: String },
    TimedOut,
}

/// Fetch the exact count and an evenly spread sample for one resolved term.
async fn sample_term(
    request: &SearchRequest,
    term: &ResolvedTerm,
    source: &dyn PublicationSource,
    settings: &SearchSettings,
) -> Result<SampleResult, PubtrendError> {
    let term_query = build_query(request, std::slice::from_ref(term));
    let wrap = |e: anyhow::Error| PubtrendError::Fetch {
        term: term.name.clone(),
        source: e,
    };

    let first = source
        .search(&term_query, 0, settings.results_per_call)
        .await
        .map_err(wrap)?;
    let total = first.count;

    let mut pmids = first.ids;
    for offset in sample_plan(total, settings.results_per_call, settings.max_samples)
        .into_iter()
        .skip(1)
    {
        let page = source
            .search(&term_query, offset, settings.results_per_call)
            .await
            .map_err(wrap)?;
        pmids.extend(page.ids);
    }

    // Adjacent sample pages can overlap near the stride boundaries; a record
    // sampled twice must not count twice.
    let mut seen = std::collections::HashSet::with_capacity(pmids.len());
    pmids.retain(|id| seen.insert(id.clone()));

    let articles = source.fetch_articles(&pmids).await.map_err(wrap)?;

    debug!(term = %term.name, total, sampled = articles.len(), "term sampled");
    Ok(aggregate(&articles, total))
}

async fn fetch_term(
    request: &SearchRequest,
    term: &ResolvedTerm,
    source: &dyn PublicationSource,
    settings: &SearchSettings,
    deadline: Option<tokio::time::Instant>,
) -> TermOutcome {
    let fut = sample_term(request, term, source, settings);
    let result = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(term = %term.name, "deadline reached, abandoning term fetch");
                return TermOutcome::TimedOut;
            }
        },
        None => fut.await,
    };

    match result {
        Ok(sample) => TermOutcome::Sampled(sample),
        Err(e) => {
            warn!(term = %term.name, error = %e, "term fetch failed");
            TermOutcome::Failed {
                term: term.name.clone(),
                error: e.to_string(),
            }
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Run one search across the given identity snapshot.
///
/// `identities` is the read-only snapshot for this request; an empty
/// `request.manufacturers` selection means all of them. The returned outcome
/// is always best-effort: single-manufacturer failures surface as
/// `degraded`/`partial` flags or `skipped` entries, never as an error.
#[instrument(skip_all, fields(topic = %request.topic))]
pub async fn run_search(
    request: &SearchRequest,
    identities: &[ManufacturerIdentity],
    source: Arc<dyn PublicationSource>,
    settings: &SearchSettings,
    progress_tx: Option<broadcast::Sender<SearchProgress>>,
) -> SearchOutcome {
    let job_id = Uuid::new_v4();
    let t0 = std::time::Instant::now();

    let mut selected: Vec<&ManufacturerIdentity> = identities
        .iter()
        .filter(|m| {
            request.manufacturers.is_empty() || request.manufacturers.contains(&m.name)
        })
        .collect();
    selected.sort_by_key(|m| m.display_order);

    let total = selected.len();
    let done = AtomicUsize::new(0);
    let deadline = settings
        .timeout
        .map(|t| tokio::time::Instant::now() + t);

    emit(
        &progress_tx,
        job_id,
        "resolve",
        format!("searching {total} manufacturer(s)"),
        0,
        total,
    );

    let fetches = selected.iter().map(|identity| {
        let source = source.as_ref();
        let progress_tx = &progress_tx;
        let done = &done;
        async move {
            let terms = match resolve(identity, request.range) {
                Ok(terms) => terms,
                Err(e) => {
                    warn!(identity = %identity.name, error = %e, "skipping invalid identity");
                    return Err(SkippedIdentity {
                        name: identity.name.clone(),
                        reason: e.to_string(),
                    });
                }
            };
            let query = build_query(request, &terms);

            let outcomes = join_all(
                terms
                    .iter()
                    .map(|term| fetch_term(request, term, source, settings, deadline)),
            )
            .await;

            let mut sampled: Vec<SampleResult> = Vec::new();
            let mut failed_terms: Vec<String> = Vec::new();
            let mut partial = false;
            for outcome in outcomes {
                match outcome {
                    TermOutcome::Sampled(result) => sampled.push(result),
                    TermOutcome::Failed { term, .. } => failed_terms.push(term),
                    TermOutcome::TimedOut => partial = true,
                }
            }

            let result = merge_terms(&sampled);
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            emit(
                progress_tx,
                job_id,
                "fetch",
                format!("{} done ({} results)", identity.name, result.total_results),
                finished,
                total,
            );

            Ok(ManufacturerReport {
                manufacturer: identity.name.clone(),
                color: identity.color.clone(),
                display_order: identity.display_order,
                query,
                terms,
                degraded: !failed_terms.is_empty(),
                partial,
                failed_terms,
                result,
            })
        }
    });

    let mut reports: Vec<ManufacturerReport> = Vec::with_capacity(total);
    let mut skipped: Vec<SkippedIdentity> = Vec::new();
    for outcome in join_all(fetches).await {
        match outcome {
            Ok(report) => reports.push(report),
            Err(skip) => skipped.push(skip),
        }
    }

    let series = combine_series(&reports, request.range);
    let duration_ms = t0.elapsed().as_millis() as u64;
    info!(
        manufacturers = reports.len(),
        skipped = skipped.len(),
        duration_ms,
        "search complete"
    );
    emit(
        &progress_tx,
        job_id,
        "complete",
        format!("{} manufacturer(s) aggregated", reports.len()),
        total,
        total,
    );

    SearchOutcome {
        job_id,
        reports,
        series,
        skipped,
        generated_at: Utc::now(),
        duration_ms,
    }
}
