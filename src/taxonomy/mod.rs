//! Per-jurisdiction clause taxonomies and risk tiering.
//!
//! - [`registry`] — [`Taxonomy`] values, the built-in `us`/`indian` tables, and
//!   the [`TaxonomyRegistry`] that resolves a [`JurisdictionSelector`].
//! - [`risk`] — maps a (label, confidence) pair to a [`RiskTier`](crate::models::RiskTier)
//!   using a taxonomy's rule table.

pub mod registry;
pub mod risk;

pub use registry::{JurisdictionSelector, RiskRule, Taxonomy, TaxonomyRegistry};
pub use risk::score_risk;
