use crate::models::RiskTier;
use crate::taxonomy::registry::Taxonomy;

/// Map a predicted clause type and its confidence to a risk tier.
///
/// - Labels in a rule bucket get the bucket's tier when `confidence` is
///   strictly above its threshold, otherwise one tier lower.
/// - Labels in no bucket (including `Unknown`) get the taxonomy's default tier.
///
/// Pure: depends only on the arguments.
pub fn score_risk(label: &str, confidence: f64, taxonomy: &Taxonomy) -> RiskTier {
    match taxonomy.rule_for(label) {
        Some(rule) if confidence > rule.threshold => rule.tier,
        Some(rule) => rule.tier.demoted(),
        None => taxonomy.default_tier(),
    }
}
