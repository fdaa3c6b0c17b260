use thiserror::Error;

use crate::models::Jurisdiction;

/// Errors that abort a whole `analyze_contract` call.
///
/// Per-clause scorer failures never show up here; they degrade into an
/// `Unknown` classification instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unknown jurisdiction: {0}")]
    UnknownJurisdiction(String),

    #[error("no scorer configured for jurisdiction: {0}")]
    NoScorer(Jurisdiction),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("invalid taxonomy '{key}': {reason}")]
    InvalidTaxonomy { key: String, reason: String },
}
