//! Clause-type classification over an injected scoring capability.
//!
//! - [`ClauseScorer`] — the capability the host supplies (a trained model, a
//!   remote endpoint, or the lexical fallback).
//! - [`Classifier`] — wraps one scorer for one jurisdiction and turns every
//!   call into a [`ClassificationResult`], degrading failures to `Unknown`.
//! - [`keyword`], [`remote`], [`chain`] — scorers shipped with the crate.

pub mod chain;
pub mod keyword;
pub mod remote;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

use crate::models::{
    ClassificationResult, Clause, LabelDistribution, RiskTier, UNKNOWN_CLAUSE_TYPE,
};
use crate::taxonomy::{score_risk, Taxonomy};

pub use chain::ScorerChain;
pub use keyword::KeywordScorer;
pub use remote::RemoteScorer;

/// Largest accepted deviation of a scorer's distribution from a total of 1.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-3;

/// Tier assigned to clauses whose classification failed.
pub const DEGRADED_RISK_TIER: RiskTier = RiskTier::Medium;

/// A scoring capability: text + taxonomy → probability for every label.
#[async_trait]
pub trait ClauseScorer: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution>;
}

/// Classifies clauses for one jurisdiction with one scorer.
#[derive(Clone)]
pub struct Classifier {
    scorer: Arc<dyn ClauseScorer>,
}

impl Classifier {
    pub fn new(scorer: Arc<dyn ClauseScorer>) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &Arc<dyn ClauseScorer> {
        &self.scorer
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Classify `clause` under `taxonomy`. Never fails: scorer errors, scorer
    /// panics and malformed distributions produce an `Unknown` result at
    /// medium risk.
    pub async fn classify(&self, clause: &Clause, taxonomy: &Taxonomy) -> ClassificationResult {
        let call = AssertUnwindSafe(self.scorer.score(&clause.text, taxonomy))
            .catch_unwind()
            .await;
        let outcome = match call {
            Ok(Ok(raw)) => validate_distribution(raw, taxonomy),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(payload) => Err(format!("scorer panicked: {}", panic_message(&*payload))),
        };

        match outcome {
            Ok(distribution) => scored_result(clause.clause_id, taxonomy, distribution),
            Err(reason) => {
                warn!(
                    clause_id = clause.clause_id,
                    jurisdiction = %taxonomy.key(),
                    scorer = self.scorer.name(),
                    error = %reason,
                    "classification failed, using fallback result"
                );
                degraded_result(clause.clause_id, taxonomy, reason)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

fn scored_result(
    clause_id: usize,
    taxonomy: &Taxonomy,
    distribution: LabelDistribution,
) -> ClassificationResult {
    // Ties go to the label declared first in the taxonomy.
    let mut best: Option<(&str, f64)> = None;
    for label in taxonomy.labels() {
        let p = distribution.get(label).unwrap_or(0.0);
        if best.map_or(true, |(_, best_p)| p > best_p) {
            best = Some((label, p));
        }
    }
    let (clause_type, confidence) = best
        .map(|(label, p)| (label.to_string(), p))
        .unwrap_or_else(|| (UNKNOWN_CLAUSE_TYPE.to_string(), 0.0));

    ClassificationResult {
        clause_id,
        jurisdiction: taxonomy.key().clone(),
        risk_level: score_risk(&clause_type, confidence, taxonomy),
        clause_type,
        confidence,
        all_scores: distribution,
        error: None,
    }
}

fn degraded_result(clause_id: usize, taxonomy: &Taxonomy, reason: String) -> ClassificationResult {
    ClassificationResult {
        clause_id,
        jurisdiction: taxonomy.key().clone(),
        clause_type: UNKNOWN_CLAUSE_TYPE.to_string(),
        confidence: 0.0,
        risk_level: DEGRADED_RISK_TIER,
        all_scores: LabelDistribution::new(),
        error: Some(reason),
    }
}

/// Check that `raw` covers exactly the taxonomy's labels with probabilities
/// summing to 1 (within [`DISTRIBUTION_TOLERANCE`]) and renormalise it.
fn validate_distribution(
    raw: LabelDistribution,
    taxonomy: &Taxonomy,
) -> std::result::Result<LabelDistribution, String> {
    if let Some(extra) = raw.labels().find(|l| !taxonomy.contains(l)) {
        return Err(format!("scorer returned label '{extra}' outside the taxonomy"));
    }
    if let Some(missing) = taxonomy.labels().iter().find(|l| raw.get(l).is_none()) {
        return Err(format!("scorer returned no probability for '{missing}'"));
    }
    if let Some((label, p)) = raw.iter().find(|(_, p)| !p.is_finite() || *p < 0.0 || *p > 1.0) {
        return Err(format!("probability {p} for '{label}' is not in [0, 1]"));
    }

    let total = raw.sum();
    if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(format!("probabilities sum to {total:.4}, expected 1"));
    }

    Ok(raw.iter().map(|(label, p)| (label, p / total)).collect())
}
