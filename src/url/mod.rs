//! URL handling module
//!
//! This module provides URL canonicalization (used for article identity),
//! site host extraction, same-site checks and site id derivation.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{derive_site_id, extract_domain, is_same_site, site_host};
pub use normalize::canonicalize_url;
