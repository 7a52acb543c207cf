//! pubtrend-common — Shared types, errors, and the identity model used across
//! all pubtrend crates.

pub mod error;
pub mod identity;
pub mod window;

// Re-export commonly used types
pub use error::{PubtrendError, Result};
pub use identity::{Acquisition, IdentitySnapshot, IdentityStore, ManufacturerIdentity, NameVariation};
pub use window::YearWindow;
