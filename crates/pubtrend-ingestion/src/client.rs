//! E-utilities search and summary-fetch client.
//!
//! Every call passes through the shared [`RateLimiter`] and the retry loop,
//! so callers can fan out freely without tracking the service ceiling
//! themselves. The engine depends on the [`PublicationSource`] trait, not on
//! this client, so tests substitute an in-memory fake.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::article::{parse_article_set, Article};
use crate::config::EutilsConfig;
use crate::rate_limit::RateLimiter;
use crate::retry::{FailureKind, RetryPolicy};

/// One page of search results: the service's exact total plus the IDs at the
/// requested offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsearchPage {
    pub count: u64,
    pub ids: Vec<String>,
}

/// The two operations the engine needs from the external service.
#[async_trait]
pub trait PublicationSource: Send + Sync {
    /// Boolean query search with pagination; returns the exact result count
    /// and the ID list at `retstart`.
    async fn search(&self, query: &str, retstart: usize, retmax: usize)
        -> anyhow::Result<EsearchPage>;

    /// Batch summary fetch; chunking to the service's IDs-per-call maximum
    /// happens inside.
    async fn fetch_articles(&self, pmids: &[String]) -> anyhow::Result<Vec<Article>>;
}

pub struct EutilsClient {
    http: Client,
    cfg: EutilsConfig,
    rate: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl EutilsClient {
    pub fn new(cfg: EutilsConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .context("failed to build HTTP client")?;
        let rate = Arc::new(RateLimiter::new(cfg.requests_per_second));
        Ok(Self {
            http,
            cfg,
            rate,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The limiter is shared so sibling clients (if any) queue on the same
    /// global ceiling.
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.rate)
    }

    fn ident_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.cfg.tool.clone())];
        if let Some(email) = &self.cfg.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.cfg.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// GET with rate limiting and bounded retry. 429 and 5xx back off and
    /// retry; other client errors fail immediately.
    async fn get_with_retry(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), endpoint);
        let mut attempt = 1u32;
        loop {
            self.rate.acquire().await;
            let (kind, retry_after, err) = match self.http.get(&url).query(params).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .map(Duration::from_secs);
                    (
                        FailureKind::from_status(status.as_u16()),
                        retry_after,
                        anyhow!("HTTP {status} from {endpoint}"),
                    )
                }
                Err(e) => {
                    let kind = if e.is_timeout() || e.is_connect() {
                        FailureKind::Transient
                    } else {
                        FailureKind::Permanent
                    };
                    (kind, None, anyhow::Error::new(e))
                }
            };

            if !self.retry.should_retry(kind, attempt) {
                return Err(err.context(format!(
                    "{endpoint} failed after {attempt} attempt(s)"
                )));
            }

            let delay = retry_after.unwrap_or_else(|| self.retry.backoff_delay(attempt));
            warn!(
                endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying after {kind:?} failure"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl PublicationSource for EutilsClient {
    #[instrument(skip(self, query))]
    async fn search(
        &self,
        query: &str,
        retstart: usize,
        retmax: usize,
    ) -> anyhow::Result<EsearchPage> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmax", retmax.to_string()),
            ("retstart", retstart.to_string()),
            ("retmode", "json".to_string()),
            ("usehistory", "n".to_string()),
        ];
        params.extend(self.ident_params());

        let resp: serde_json::Value = self
            .get_with_retry("esearch.fcgi", &params)
            .await?
            .json()
            .await?;

        // The service reports the count as a JSON string.
        let count = resp["esearchresult"]["count"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| resp["esearchresult"]["count"].as_u64())
            .unwrap_or(0);
        let ids = resp["esearchresult"]["idlist"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect::<Vec<_>>();

        debug!(count, page_len = ids.len(), "esearch page");
        Ok(EsearchPage { count, ids })
    }

    #[instrument(skip(self, pmids), fields(n = pmids.len()))]
    async fn fetch_articles(&self, pmids: &[String]) -> anyhow::Result<Vec<Article>> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }

        let mut articles = Vec::with_capacity(pmids.len());
        for chunk in pmids.chunks(self.cfg.max_ids_per_fetch.max(1)) {
            let mut params = vec![
                ("db", "pubmed".to_string()),
                ("id", chunk.join(",")),
                ("rettype", "abstract".to_string()),
                ("retmode", "xml".to_string()),
            ];
            params.extend(self.ident_params());

            let xml = self
                .get_with_retry("efetch.fcgi", &params)
                .await?
                .text()
                .await?;
            articles.extend(parse_article_set(&xml));
        }
        Ok(articles)
    }
}
