use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::{ClassificationResult, Jurisdiction, JurisdictionSummary, RiskDistribution, RiskTier};

/// Ratio thresholds for the document-level risk tier. Comparisons are strict.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// High share above which the document is high risk.
    pub high_ratio: f64,
    /// High share above which the document is at least medium risk.
    pub elevated_high_ratio: f64,
    /// Medium share above which the document is at least medium risk.
    pub medium_ratio: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            high_ratio: 0.3,
            elevated_high_ratio: 0.1,
            medium_ratio: 0.5,
        }
    }
}

/// Fold the results belonging to `jurisdiction` into a fresh summary.
/// Results for other jurisdictions are ignored.
pub fn summarize<'a>(
    results: impl IntoIterator<Item = &'a ClassificationResult>,
    jurisdiction: &Jurisdiction,
    config: &AggregationConfig,
) -> JurisdictionSummary {
    let mut risk_distribution = RiskDistribution::default();
    let mut clause_types: BTreeMap<String, usize> = BTreeMap::new();

    for result in results.into_iter().filter(|r| &r.jurisdiction == jurisdiction) {
        risk_distribution.record(result.risk_level);
        *clause_types.entry(result.clause_type.clone()).or_insert(0) += 1;
    }

    JurisdictionSummary {
        jurisdiction: jurisdiction.clone(),
        overall_risk: overall_risk(&risk_distribution, config),
        risk_distribution,
        clause_types,
    }
}

/// Document-level tier from per-clause tier counts.
///
/// Checked in order: no clauses → low; high share above `high_ratio` → high;
/// high share above `elevated_high_ratio` or medium share above
/// `medium_ratio` → medium; otherwise low.
pub fn overall_risk(distribution: &RiskDistribution, config: &AggregationConfig) -> RiskTier {
    let total = distribution.total();
    if total == 0 {
        return RiskTier::Low;
    }

    let high_ratio = distribution.high as f64 / total as f64;
    let medium_ratio = distribution.medium as f64 / total as f64;

    if high_ratio > config.high_ratio {
        RiskTier::High
    } else if high_ratio > config.elevated_high_ratio || medium_ratio > config.medium_ratio {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}
