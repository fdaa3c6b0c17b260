//! Report renderers for analysis results.
//!
//! - [`terminal`] — per-jurisdiction summary boxes, clause tables, and the
//!   comparison section; respects `--verbose` / `--quiet`.
//!
//! JSON output is the serialized [`crate::models::AnalysisResult`].

pub mod terminal;
