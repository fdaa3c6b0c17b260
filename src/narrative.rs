//! Human-readable risk prose.
//!
//! Narratives are derived from finished results and never feed back into
//! them. [`RuleBasedNarrator`] is the built-in implementation; hosts that want
//! generated prose can implement [`Narrator`] themselves.

use crate::models::{
    truncate_preview, ClauseAnalysis, ComparisonResult, JurisdictionSummary, RiskTier,
};

/// How many high-risk clauses an assessment lists.
const TOP_HIGH_RISK_CLAUSES: usize = 3;
/// How many unique labels per side a comparison lists.
const TOP_UNIQUE_LABELS: usize = 3;
const CLAUSE_SNIPPET_CHARS: usize = 100;

pub trait Narrator {
    fn explain_summary(&self, summary: &JurisdictionSummary, analyses: &[ClauseAnalysis]) -> String;

    fn explain_comparison(&self, comparison: &ComparisonResult) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedNarrator;

impl Narrator for RuleBasedNarrator {
    fn explain_summary(&self, summary: &JurisdictionSummary, analyses: &[ClauseAnalysis]) -> String {
        let key = summary.jurisdiction.as_str().to_uppercase();
        let dist = &summary.risk_distribution;

        let mut out = format!(
            "Risk Assessment Summary for {key} jurisdiction:\n\n\
             Overall Risk Level: {}\n\n\
             Risk Distribution:\n\
             - High Risk: {} clauses\n\
             - Medium Risk: {} clauses\n\
             - Low Risk: {} clauses",
            upper(summary.overall_risk),
            dist.high,
            dist.medium,
            dist.low,
        );

        let high: Vec<_> = analyses
            .iter()
            .filter_map(|a| {
                a.result_for(&summary.jurisdiction)
                    .filter(|r| r.risk_level == RiskTier::High)
                    .map(|r| (a, r))
            })
            .take(TOP_HIGH_RISK_CLAUSES)
            .collect();

        if !high.is_empty() {
            out.push_str("\n\nHigh Risk Clauses Requiring Attention:");
            for (analysis, result) in high {
                out.push_str(&format!(
                    "\n- Clause {} ({}): {}",
                    analysis.clause_id,
                    result.clause_type,
                    truncate_preview(&analysis.text, CLAUSE_SNIPPET_CHARS)
                ));
            }
        }

        out
    }

    fn explain_comparison(&self, comparison: &ComparisonResult) -> String {
        let first = comparison.first.as_str().to_uppercase();
        let second = comparison.second.as_str().to_uppercase();
        let first_risk = comparison.first_overall_risk;
        let second_risk = comparison.second_overall_risk;

        let mut out = format!(
            "Jurisdiction Comparison Summary:\n\n\
             Risk Level Comparison:\n\
             - {first} Jurisdiction: {} risk\n\
             - {second} Jurisdiction: {} risk\n\n\
             Key Observations:",
            upper(first_risk),
            upper(second_risk),
        );

        if comparison.risk_diverges {
            out.push_str(&format!(
                "\n- Risk levels differ: {first} shows {first_risk} risk while {second} shows {second_risk} risk"
            ));
            out.push_str(
                "\n- This suggests jurisdiction-specific legal considerations affect risk assessment",
            );
        } else {
            out.push_str(&format!(
                "\n- Both jurisdictions show similar {first_risk} risk levels"
            ));
            out.push_str("\n- Contract terms appear relatively consistent across jurisdictions");
        }

        if !comparison.unique_to_first.is_empty() {
            out.push_str(&format!(
                "\n- {first}-specific considerations: {}",
                top_labels(comparison.unique_to_first.iter())
            ));
        }
        if !comparison.unique_to_second.is_empty() {
            out.push_str(&format!(
                "\n- {second}-specific considerations: {}",
                top_labels(comparison.unique_to_second.iter())
            ));
        }

        out
    }
}

fn upper(tier: RiskTier) -> String {
    tier.to_string().to_uppercase()
}

fn top_labels<'a>(labels: impl Iterator<Item = &'a String>) -> String {
    labels
        .take(TOP_UNIQUE_LABELS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
