use std::collections::BTreeSet;

use crate::models::{ComparisonResult, JurisdictionSummary};

/// Structural diff of two jurisdiction summaries.
///
/// Swapping `first` and `second` swaps the two unique-label sets.
pub fn compare(first: &JurisdictionSummary, second: &JurisdictionSummary) -> ComparisonResult {
    let first_labels: BTreeSet<&String> = first.clause_types.keys().collect();
    let second_labels: BTreeSet<&String> = second.clause_types.keys().collect();

    ComparisonResult {
        first: first.jurisdiction.clone(),
        second: second.jurisdiction.clone(),
        first_overall_risk: first.overall_risk,
        second_overall_risk: second.overall_risk,
        risk_diverges: first.overall_risk != second.overall_risk,
        unique_to_first: first_labels
            .difference(&second_labels)
            .map(|l| l.to_string())
            .collect(),
        unique_to_second: second_labels
            .difference(&first_labels)
            .map(|l| l.to_string())
            .collect(),
    }
}
