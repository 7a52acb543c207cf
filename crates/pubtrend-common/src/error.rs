use thiserror::Error;

#[derive(Debug, Error)]
pub enum PubtrendError {
    /// Malformed manufacturer definition. Fatal for that identity only;
    /// the engine skips it with a warning and the rest proceed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or rate-limit exhaustion for one resolved term. Recovered
    /// per-term: the owning manufacturer is reported as degraded.
    #[error("Fetch failed for term '{term}': {source}")]
    Fetch {
        term: String,
        #[source]
        source: anyhow::Error,
    },

    /// Malformed article record. The record is skipped, the batch survives.
    #[error("Article parse error: {0}")]
    Parse(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PubtrendError>;
