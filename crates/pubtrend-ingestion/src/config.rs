//! Client configuration.
//!
//! The rate ceiling and identification parameters are configuration, never
//! hardcoded at call sites. NCBI grants 3 requests/second without an API key
//! and 10 with one; both the ceiling and the key come from the environment in
//! the default setup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_TOOL: &str = "pubtrend";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

fn default_rps() -> f64 {
    3.0
}

fn default_max_ids() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EutilsConfig {
    /// Base URL of the E-utilities service; overridden in tests to point at
    /// a local mock server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// NCBI API key, raises the rate ceiling server-side.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Client identification sent with every call.
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Shared request-rate ceiling across the whole process.
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    /// Maximum IDs per efetch call; larger batches are chunked.
    #[serde(default = "default_max_ids")]
    pub max_ids_per_fetch: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            tool: default_tool(),
            email: None,
            requests_per_second: default_rps(),
            max_ids_per_fetch: default_max_ids(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EutilsConfig {
    /// Reads `PUBMED_API_KEY`, `CONTACT_EMAIL` and `PUBMED_RATE_LIMIT` from
    /// the environment (a `.env` file is honored when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();
        cfg.api_key = std::env::var("PUBMED_API_KEY").ok().filter(|k| !k.is_empty());
        cfg.email = std::env::var("CONTACT_EMAIL").ok().filter(|e| !e.is_empty());
        if let Some(rps) = std::env::var("PUBMED_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            cfg.requests_per_second = rps;
        } else if cfg.api_key.is_some() {
            cfg.requests_per_second = 10.0;
        }
        cfg
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EutilsConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.requests_per_second, 3.0);
        assert_eq!(cfg.max_ids_per_fetch, 100);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let cfg: EutilsConfig =
            serde_json::from_str(r#"{"requests_per_second": 10.0, "api_key": "k"}"#).unwrap();
        assert_eq!(cfg.requests_per_second, 10.0);
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.tool, DEFAULT_TOOL);
    }
}
