//! `contract-risk` — split a contract into clauses, classify each clause under
//! one or more jurisdictions, score its risk, and roll the results up.
//!
//! # Flow
//! 1. Segment the text into clauses ([`segmenter`]).
//! 2. Classify every (clause, jurisdiction) pair ([`classifier`]).
//! 3. Map label and confidence to a risk tier ([`taxonomy::score_risk`]).
//! 4. Summarise each jurisdiction ([`aggregator`]).
//! 5. Compare two jurisdictions ([`compare`]).
//!
//! [`pipeline::Pipeline`] drives all of it.

pub mod aggregator;
pub mod classifier;
pub mod compare;
pub mod config;
pub mod error;
pub mod models;
pub mod narrative;
pub mod pipeline;
pub mod report;
pub mod segmenter;
pub mod taxonomy;

pub use error::AnalysisError;
pub use pipeline::{CancelFlag, Pipeline, PipelineConfig, Progress};
