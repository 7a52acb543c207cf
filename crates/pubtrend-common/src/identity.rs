//! Manufacturer identity model.
//!
//! A manufacturer is long-lived configuration: a canonical name, the name
//! variations it has published under over time, and the companies it has
//! absorbed. Identities are created and edited by an external management
//! interface; the core reads an immutable snapshot per request and never
//! writes one back.

use serde::{Deserialize, Serialize};

use crate::error::{PubtrendError, Result};
use crate::window::YearWindow;

/// A literal search string valid for an inclusive year range.
/// Windows of one identity may overlap or leave gaps; the resolver merges
/// overlaps and tolerates gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVariation {
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
}

impl NameVariation {
    pub fn window(&self) -> YearWindow {
        YearWindow::new(self.start_year, self.end_year)
    }
}

/// A one-time absorption event. Publications under `name` are attributed to
/// the acquiring identity from `year` onward; before `year` the acquired
/// company's own name is searched as a pre-acquisition alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acquisition {
    pub name: String,
    pub year: i32,
}

/// Canonical manufacturer identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerIdentity {
    /// Canonical name, unique key within a snapshot. Never empty.
    pub name: String,
    /// Display color, passed through to the presentation layer untouched.
    #[serde(default)]
    pub color: Option<String>,
    /// Presentation ordering. Ties break by declaration order in the snapshot.
    #[serde(default)]
    pub display_order: u32,
    #[serde(default)]
    pub variations: Vec<NameVariation>,
    #[serde(default)]
    pub acquisitions: Vec<Acquisition>,
}

impl ManufacturerIdentity {
    /// Checks the structural invariants. A violation is fatal for this
    /// identity only; callers skip it and continue with the rest.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PubtrendError::Configuration(
                "canonical manufacturer name must not be empty".to_string(),
            ));
        }
        for v in &self.variations {
            if v.name.trim().is_empty() {
                return Err(PubtrendError::Configuration(format!(
                    "identity '{}' has a variation with an empty name",
                    self.name
                )));
            }
            if v.start_year > v.end_year {
                return Err(PubtrendError::Configuration(format!(
                    "identity '{}': variation '{}' has start_year {} > end_year {}",
                    self.name, v.name, v.start_year, v.end_year
                )));
            }
        }
        for a in &self.acquisitions {
            if a.name.trim().is_empty() {
                return Err(PubtrendError::Configuration(format!(
                    "identity '{}' has an acquisition with an empty name",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

// ── Identity store boundary ──────────────────────────────────────────────────

/// Sole source of truth for manufacturer definitions. The core only ever
/// reads; create/edit/delete live behind an external management interface.
pub trait IdentityStore {
    /// All identities ordered by `display_order`, ties by declaration order.
    fn list(&self) -> Vec<ManufacturerIdentity>;
}

/// Read-only file snapshot of the identity list, loaded once per request so
/// concurrent edits to the backing file cannot race an in-flight search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    #[serde(default)]
    pub manufacturers: Vec<ManufacturerIdentity>,
}

impl IdentitySnapshot {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| PubtrendError::Configuration(format!("invalid identity snapshot: {e}")))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| PubtrendError::Configuration(format!("invalid identity snapshot: {e}")))
    }

    /// Load from a `.json` or `.yaml`/`.yml` file, chosen by extension.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PubtrendError::Configuration(format!("cannot read {}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }
}

impl IdentityStore for IdentitySnapshot {
    fn list(&self) -> Vec<ManufacturerIdentity> {
        let mut out = self.manufacturers.clone();
        // Stable sort keeps declaration order on equal display_order.
        out.sort_by_key(|m| m.display_order);
        out
    }
}
