use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Label used when a clause could not be classified.
pub const UNKNOWN_CLAUSE_TYPE: &str = "Unknown";

/// Coarse risk classification for a clause or a whole document.
///
/// Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// The tier one step below this one. `Low` stays `Low`.
    pub fn demoted(self) -> RiskTier {
        match self {
            RiskTier::High => RiskTier::Medium,
            RiskTier::Medium | RiskTier::Low => RiskTier::Low,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::High => write!(f, "high"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(RiskTier::High),
            "medium" => Ok(RiskTier::Medium),
            "low" => Ok(RiskTier::Low),
            other => Err(format!("unknown risk tier '{other}'")),
        }
    }
}

/// Lowercase key identifying a registered taxonomy, e.g. `us` or `indian`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One segmented unit of contract text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// 1-based position, stable within one analysis run.
    pub clause_id: usize,
    pub text: String,
    /// Display-truncated copy of `text`.
    pub preview: String,
}

impl Clause {
    pub fn new(clause_id: usize, text: String, preview_chars: usize) -> Self {
        let preview = truncate_preview(&text, preview_chars);
        Self {
            clause_id,
            text,
            preview,
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Label → probability mapping produced by a scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDistribution(BTreeMap<String, f64>);

impl LabelDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, probability: f64) {
        self.0.insert(label.into(), probability);
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, p)| (label.as_str(), *p))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for LabelDistribution {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, p)| (l.into(), p)).collect())
    }
}

/// Classification of one clause under one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub clause_id: usize,
    pub jurisdiction: Jurisdiction,
    pub clause_type: String,
    pub confidence: f64,
    pub risk_level: RiskTier,
    pub all_scores: LabelDistribution,
    /// Set only when the scorer failed and the result is the cautious fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationResult {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// A clause together with its classification under every requested jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseAnalysis {
    pub clause_id: usize,
    /// Display preview of the clause text.
    pub text: String,
    pub classifications: Vec<ClassificationResult>,
}

impl ClauseAnalysis {
    pub fn result_for(&self, jurisdiction: &Jurisdiction) -> Option<&ClassificationResult> {
        self.classifications
            .iter()
            .find(|r| &r.jurisdiction == jurisdiction)
    }
}

/// Per-tier clause counts. All three tiers are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskDistribution {
    pub fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::High => self.high += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::Low => self.low += 1,
        }
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionSummary {
    pub jurisdiction: Jurisdiction,
    pub risk_distribution: RiskDistribution,
    /// Observed clause-type label → number of clauses.
    pub clause_types: BTreeMap<String, usize>,
    pub overall_risk: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub first: Jurisdiction,
    pub second: Jurisdiction,
    pub first_overall_risk: RiskTier,
    pub second_overall_risk: RiskTier,
    pub risk_diverges: bool,
    pub unique_to_first: BTreeSet<String>,
    pub unique_to_second: BTreeSet<String>,
}

/// Complete output of one `analyze_contract` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_clauses: usize,
    pub clause_analyses: Vec<ClauseAnalysis>,
    /// One summary per analysed jurisdiction, in registry order.
    pub summary: Vec<JurisdictionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
}

impl AnalysisResult {
    pub fn summary_for(&self, jurisdiction: &Jurisdiction) -> Option<&JurisdictionSummary> {
        self.summary.iter().find(|s| &s.jurisdiction == jurisdiction)
    }

    /// All classification results for one jurisdiction, in clause order.
    pub fn results_for<'a>(
        &'a self,
        jurisdiction: &'a Jurisdiction,
    ) -> impl Iterator<Item = &'a ClassificationResult> + 'a {
        self.clause_analyses
            .iter()
            .filter_map(move |a| a.result_for(jurisdiction))
    }
}
