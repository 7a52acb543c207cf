//! pubtrend-ingestion — Rate-limited NCBI E-utilities access.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi
//!
//! Everything network-facing lives here: the shared rate limiter, the retry
//! policy, the client itself, and the article XML parser. The engine crate
//! only sees the `PublicationSource` trait.

pub mod article;
pub mod client;
pub mod config;
pub mod rate_limit;
pub mod retry;

pub use article::{Article, Grant, PubDate};
pub use client::{EsearchPage, EutilsClient, PublicationSource};
pub use config::EutilsConfig;
pub use rate_limit::RateLimiter;
pub use retry::{FailureKind, RetryPolicy};
