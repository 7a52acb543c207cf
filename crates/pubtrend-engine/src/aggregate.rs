//! Sampled statistics over fetched article records.
//!
//! Result sets are usually far too large to fetch in full, so statistics are
//! computed over a bounded sample and every figure travels with its coverage
//! (`sampled_results` / `total_results`). Nothing here extrapolates to the
//! full population.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use pubtrend_ingestion::Article;

/// Tally lists are truncated to this many entries.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEntry {
    pub name: String,
    pub count: u64,
}

/// Sample-based statistics for one resolved term (or, after merging, one
/// manufacturer). `total_results` is the service's exact count; everything
/// else describes only the fetched sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub total_results: u64,
    pub sampled_results: u64,
    /// `sampled / total * 100`, 0 when there are no results at all.
    pub sampling_percentage: f64,
    /// Publication-year buckets, ascending. Records with no parseable year
    /// count toward `sampled_results` but appear in no bucket.
    pub year_counts: BTreeMap<i32, u64>,
    pub top_authors: Vec<TopEntry>,
    pub top_journals: Vec<TopEntry>,
    pub top_affiliations: Vec<TopEntry>,
    pub top_grants: Vec<TopEntry>,
    pub top_mesh_terms: Vec<TopEntry>,
}

/// Coverage percentage, rounded to two decimals and clamped to [0, 100].
pub(crate) fn sampling_percentage(sampled: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = sampled as f64 / total as f64 * 100.0;
    (pct.min(100.0) * 100.0).round() / 100.0
}

/// Sort descending by count, alphabetical (case-insensitive) on ties,
/// truncate to [`TOP_N`].
pub(crate) fn top_n(tally: HashMap<String, u64>) -> Vec<TopEntry> {
    let mut entries: Vec<TopEntry> = tally
        .into_iter()
        .map(|(name, count)| TopEntry { name, count })
        .collect();
    entries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    entries.truncate(TOP_N);
    entries
}

/// Compute sample statistics. `total_results` comes from the search step's
/// exact count and is never recomputed from the sample.
pub fn aggregate(articles: &[Article], total_results: u64) -> SampleResult {
    let mut year_counts: BTreeMap<i32, u64> = BTreeMap::new();
    let mut authors: HashMap<String, u64> = HashMap::new();
    let mut journals: HashMap<String, u64> = HashMap::new();
    let mut affiliations: HashMap<String, u64> = HashMap::new();
    let mut grants: HashMap<String, u64> = HashMap::new();
    let mut mesh_terms: HashMap<String, u64> = HashMap::new();

    for article in articles {
        if let Some(year) = article.pub_date.year {
            *year_counts.entry(year).or_insert(0) += 1;
        }
        for author in &article.authors {
            *authors.entry(author.clone()).or_insert(0) += 1;
        }
        if let Some(journal) = &article.journal {
            *journals.entry(journal.clone()).or_insert(0) += 1;
        }
        for affiliation in &article.affiliations {
            *affiliations.entry(affiliation.clone()).or_insert(0) += 1;
        }
        for grant in &article.grants {
            *grants.entry(grant.tally_key()).or_insert(0) += 1;
        }
        for term in &article.mesh_terms {
            *mesh_terms.entry(term.clone()).or_insert(0) += 1;
        }
    }

    let sampled_results = articles.len() as u64;
    SampleResult {
        total_results,
        sampled_results,
        sampling_percentage: sampling_percentage(sampled_results, total_results),
        year_counts,
        top_authors: top_n(authors),
        top_journals: top_n(journals),
        top_affiliations: top_n(affiliations),
        top_grants: top_n(grants),
        top_mesh_terms: top_n(mesh_terms),
    }
}

/// Offsets to sample at, spread evenly across the full result set:
/// `num = min(max_samples / per_call, ceil(total / per_call))` pages,
/// page `i` starting at `i * (total / num)`.
pub fn sample_plan(total: u64, per_call: usize, max_samples: usize) -> Vec<usize> {
    if total == 0 || per_call == 0 {
        return vec![];
    }
    let by_budget = (max_samples / per_call) as u64;
    let needed = total.div_ceil(per_call as u64);
    let num = by_budget.min(needed);
    if num == 0 {
        return vec![];
    }
    let stride = total / num;
    (0..num).map(|i| (i * stride) as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubtrend_ingestion::{Grant, PubDate};

    fn article(pmid: &str, year: Option<i32>) -> Article {
        Article {
            pmid: pmid.to_string(),
            title: format!("Article {pmid}"),
            pub_date: PubDate { year, month: None, day: None },
            ..Article::default()
        }
    }

    #[test]
    fn test_empty_sample_with_zero_total() {
        let result = aggregate(&[], 0);
        assert_eq!(result.total_results, 0);
        assert_eq!(result.sampled_results, 0);
        assert_eq!(result.sampling_percentage, 0.0);
        assert!(result.year_counts.is_empty());
        assert!(result.top_authors.is_empty());
    }

    #[test]
    fn test_sampling_percentage_bounds() {
        assert_eq!(sampling_percentage(0, 0), 0.0);
        assert_eq!(sampling_percentage(50, 200), 25.0);
        assert_eq!(sampling_percentage(1, 3), 33.33);
        // Sampling never reports more than full coverage.
        assert_eq!(sampling_percentage(250, 200), 100.0);
    }

    #[test]
    fn test_year_buckets_exclude_undated_records() {
        let articles = vec![
            article("1", Some(2019)),
            article("2", Some(2019)),
            article("3", Some(2021)),
            article("4", None),
        ];
        let result = aggregate(&articles, 400);
        assert_eq!(result.sampled_results, 4);
        assert_eq!(result.year_counts.get(&2019), Some(&2));
        assert_eq!(result.year_counts.get(&2021), Some(&1));
        // Dated records sum to sampled_results minus the undated one.
        let dated: u64 = result.year_counts.values().sum();
        assert_eq!(dated, result.sampled_results - 1);
    }

    #[test]
    fn test_year_buckets_ascending() {
        let articles = vec![
            article("1", Some(2021)),
            article("2", Some(1998)),
            article("3", Some(2010)),
        ];
        let result = aggregate(&articles, 3);
        let years: Vec<i32> = result.year_counts.keys().copied().collect();
        assert_eq!(years, vec![1998, 2010, 2021]);
    }

    #[test]
    fn test_top_n_truncates_and_orders() {
        let mut tally = HashMap::new();
        for i in 0..15 {
            tally.insert(format!("Journal {i:02}"), i as u64);
        }
        let top = top_n(tally);
        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0].name, "Journal 14");
        assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_top_n_ties_break_alphabetically_case_insensitive() {
        let mut tally = HashMap::new();
        tally.insert("beta".to_string(), 5);
        tally.insert("Alpha".to_string(), 5);
        tally.insert("gamma".to_string(), 7);
        let top = top_n(tally);
        assert_eq!(top[0].name, "gamma");
        assert_eq!(top[1].name, "Alpha");
        assert_eq!(top[2].name, "beta");
    }

    #[test]
    fn test_aggregate_tallies_all_dimensions() {
        let mut a = article("1", Some(2020));
        a.authors = vec!["Nilsson, Anna".to_string(), "Okafor, Chidi".to_string()];
        a.journal = Some("Medical Physics".to_string());
        a.affiliations = vec!["Varian Medical Systems".to_string()];
        a.grants = vec![Grant { id: "R01CA1".to_string(), agency: "NCI".to_string() }];
        a.mesh_terms = vec!["Radiotherapy Dosage".to_string()];

        let mut b = article("2", Some(2020));
        b.authors = vec!["Nilsson, Anna".to_string()];
        b.journal = Some("Medical Physics".to_string());

        let result = aggregate(&[a, b], 100);
        assert_eq!(result.top_authors[0], TopEntry { name: "Nilsson, Anna".to_string(), count: 2 });
        assert_eq!(result.top_journals[0].count, 2);
        assert_eq!(result.top_grants[0].name, "R01CA1 (NCI)");
        assert_eq!(result.top_mesh_terms[0].name, "Radiotherapy Dosage");
        assert_eq!(result.sampling_percentage, 2.0);
    }

    #[test]
    fn test_sample_plan_zero_total() {
        assert!(sample_plan(0, 100, 10_000).is_empty());
    }

    #[test]
    fn test_sample_plan_small_result_set_is_single_page() {
        assert_eq!(sample_plan(42, 100, 10_000), vec![0]);
    }

    #[test]
    fn test_sample_plan_spreads_across_result_set() {
        // 100k results, 10k budget at 100/page: 100 pages, stride 1000.
        let plan = sample_plan(100_000, 100, 10_000);
        assert_eq!(plan.len(), 100);
        assert_eq!(plan[0], 0);
        assert_eq!(plan[1], 1000);
        assert_eq!(plan[99], 99_000);
    }

    #[test]
    fn test_sample_plan_caps_at_budget() {
        let plan = sample_plan(1_000_000, 100, 500);
        assert_eq!(plan.len(), 5);
    }
}
