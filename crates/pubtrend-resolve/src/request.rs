//! Search request parameters.
//!
//! Every recognized filter is an explicit field here; there is no dynamic
//! filter dictionary. Presence or absence of statistics sections is a
//! presentation decision, not encoded in the request.

use serde::{Deserialize, Serialize};

use pubtrend_common::YearWindow;

/// Which field tag wraps the free-text topic. Manufacturer clauses are not
/// affected by the scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    Author,
    Journal,
    Affiliation,
    #[default]
    Unscoped,
}

impl FieldScope {
    /// The E-utilities field tag, empty for unscoped topics so PubMed's
    /// automatic term mapping still applies.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldScope::Author => "[Author]",
            FieldScope::Journal => "[Journal]",
            FieldScope::Affiliation => "[Affiliation]",
            FieldScope::Unscoped => "",
        }
    }
}

/// Advanced filters, always AND-combined with each other and with the topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub grant_number: Option<String>,
    #[serde(default)]
    pub publication_type: Option<String>,
    #[serde(default)]
    pub mesh_terms: Vec<String>,
    #[serde(default)]
    pub scope: FieldScope,
}

/// One request-scoped search: free-text topic, requested year range,
/// selected manufacturers (empty selects the whole snapshot) and filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub range: YearWindow,
    #[serde(default)]
    pub manufacturers: Vec<String>,
    #[serde(default)]
    pub filters: SearchFilters,
}

impl SearchRequest {
    pub fn new(topic: impl Into<String>, range: YearWindow) -> Self {
        Self {
            topic: topic.into(),
            range,
            manufacturers: vec![],
            filters: SearchFilters::default(),
        }
    }
}
