use std::collections::HashSet;

use crate::error::AnalysisError;
use crate::models::{Jurisdiction, RiskTier};

/// Clause types shared by every built-in jurisdiction.
const COMMON_CLAUSE_TYPES: [&str; 12] = [
    "Termination",
    "Payment",
    "Liability",
    "Confidentiality",
    "Intellectual Property",
    "Governing Law",
    "Dispute Resolution",
    "Force Majeure",
    "Indemnification",
    "Warranties",
    "Deliverables",
    "Term",
];

const INDIAN_CLAUSE_TYPES: [&str; 3] = ["Compliance", "Registration", "Stamp Duty"];

const HIGH_RISK_CLAUSES: [&str; 4] = ["Liability", "Indemnification", "Termination", "Governing Law"];
const MEDIUM_RISK_CLAUSES: [&str; 3] = ["Payment", "Intellectual Property", "Confidentiality"];

pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 0.6;

/// One bucket of the risk-rule table.
///
/// A label in this bucket scores `tier` when the classifier's confidence is
/// strictly above `threshold`, and one tier lower otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRule {
    pub tier: RiskTier,
    pub threshold: f64,
    pub labels: Vec<String>,
}

impl RiskRule {
    pub fn new(tier: RiskTier, threshold: f64, labels: &[&str]) -> Self {
        Self {
            tier,
            threshold,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// A jurisdiction's clause-type labels and risk rules.
///
/// Immutable once built; [`Taxonomy::new`] checks that labels are unique, that
/// every rule label belongs to the taxonomy, and that no label sits in two
/// rule buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    key: Jurisdiction,
    name: String,
    labels: Vec<String>,
    rules: Vec<RiskRule>,
    default_tier: RiskTier,
}

impl Taxonomy {
    pub fn new(
        key: Jurisdiction,
        name: impl Into<String>,
        labels: Vec<String>,
        rules: Vec<RiskRule>,
    ) -> Result<Self, AnalysisError> {
        if key.as_str().is_empty() {
            return Err(AnalysisError::InvalidTaxonomy {
                key: String::new(),
                reason: "jurisdiction key is empty".into(),
            });
        }
        if let Err(reason) = validate(&labels, &rules) {
            return Err(AnalysisError::InvalidTaxonomy {
                key: key.to_string(),
                reason,
            });
        }

        Ok(Self {
            key,
            name: name.into(),
            labels,
            rules,
            default_tier: RiskTier::Low,
        })
    }

    pub fn key(&self) -> &Jurisdiction {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clause-type labels in declaration order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rules(&self) -> &[RiskRule] {
        &self.rules
    }

    /// Tier for labels not listed in any rule bucket.
    pub fn default_tier(&self) -> RiskTier {
        self.default_tier
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn rule_for(&self, label: &str) -> Option<&RiskRule> {
        self.rules
            .iter()
            .find(|rule| rule.labels.iter().any(|l| l == label))
    }

    /// Copy of this taxonomy with the threshold of every `tier` bucket replaced.
    pub fn with_threshold(mut self, tier: RiskTier, threshold: f64) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnalysisError::InvalidTaxonomy {
                key: self.key.to_string(),
                reason: format!("threshold {threshold} for {tier} tier is outside [0, 1]"),
            });
        }
        for rule in self.rules.iter_mut().filter(|r| r.tier == tier) {
            rule.threshold = threshold;
        }
        Ok(self)
    }
}

fn validate(labels: &[String], rules: &[RiskRule]) -> Result<(), String> {
    if labels.is_empty() {
        return Err("no clause-type labels".into());
    }

    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err("empty clause-type label".into());
        }
        if !seen.insert(label.as_str()) {
            return Err(format!("duplicate label '{label}'"));
        }
    }

    let mut bucketed = HashSet::new();
    for rule in rules {
        if !(0.0..=1.0).contains(&rule.threshold) {
            return Err(format!(
                "threshold {} for {} tier is outside [0, 1]",
                rule.threshold, rule.tier
            ));
        }
        for label in &rule.labels {
            if !seen.contains(label.as_str()) {
                return Err(format!("risk rule names unknown label '{label}'"));
            }
            if !bucketed.insert(label.as_str()) {
                return Err(format!("label '{label}' appears in more than one risk bucket"));
            }
        }
    }

    Ok(())
}

/// Which jurisdictions an analysis covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JurisdictionSelector {
    /// Every registered jurisdiction, in registration order.
    All,
    One(Jurisdiction),
}

impl std::str::FromStr for JurisdictionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" | "all" => Ok(JurisdictionSelector::All),
            key => Ok(JurisdictionSelector::One(Jurisdiction::new(key))),
        }
    }
}

impl std::fmt::Display for JurisdictionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JurisdictionSelector::All => write!(f, "all"),
            JurisdictionSelector::One(key) => write!(f, "{key}"),
        }
    }
}

/// Registry of taxonomies keyed by jurisdiction.
///
/// Nothing outside the registry branches on a jurisdiction key; adding a
/// jurisdiction means registering another [`Taxonomy`].
#[derive(Debug, Clone, Default)]
pub struct TaxonomyRegistry {
    taxonomies: Vec<Taxonomy>,
}

impl TaxonomyRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in `us` and `indian` taxonomies.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(us_taxonomy());
        registry.register(indian_taxonomy());
        registry
    }

    /// Add a taxonomy, replacing any existing one with the same key in place.
    pub fn register(&mut self, taxonomy: Taxonomy) {
        match self.taxonomies.iter_mut().find(|t| t.key() == taxonomy.key()) {
            Some(existing) => *existing = taxonomy,
            None => self.taxonomies.push(taxonomy),
        }
    }

    pub fn taxonomy_for(&self, key: &str) -> Result<&Taxonomy, AnalysisError> {
        let key = Jurisdiction::new(key);
        self.taxonomies
            .iter()
            .find(|t| t.key() == &key)
            .ok_or_else(|| AnalysisError::UnknownJurisdiction(key.to_string()))
    }

    /// Taxonomies covered by `selector`, in registration order.
    pub fn resolve(&self, selector: &JurisdictionSelector) -> Result<Vec<&Taxonomy>, AnalysisError> {
        match selector {
            JurisdictionSelector::All => Ok(self.taxonomies.iter().collect()),
            JurisdictionSelector::One(key) => Ok(vec![self.taxonomy_for(key.as_str())?]),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &Jurisdiction> {
        self.taxonomies.iter().map(Taxonomy::key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Taxonomy> {
        self.taxonomies.iter()
    }

    pub fn len(&self) -> usize {
        self.taxonomies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxonomies.is_empty()
    }
}

/// Default two-bucket rule table used by the built-in taxonomies.
pub fn default_rules() -> Vec<RiskRule> {
    vec![
        RiskRule::new(RiskTier::High, DEFAULT_HIGH_THRESHOLD, &HIGH_RISK_CLAUSES),
        RiskRule::new(RiskTier::Medium, DEFAULT_MEDIUM_THRESHOLD, &MEDIUM_RISK_CLAUSES),
    ]
}

fn us_taxonomy() -> Taxonomy {
    let labels = COMMON_CLAUSE_TYPES.iter().map(|l| l.to_string()).collect();
    builtin_taxonomy("us", "US Contract Law", labels)
}

fn indian_taxonomy() -> Taxonomy {
    let labels = COMMON_CLAUSE_TYPES
        .iter()
        .chain(INDIAN_CLAUSE_TYPES.iter())
        .map(|l| l.to_string())
        .collect();
    builtin_taxonomy("indian", "Indian Contract Act", labels)
}

fn builtin_taxonomy(key: &str, name: &str, labels: Vec<String>) -> Taxonomy {
    // Built-in tables are constants; `test_builtin_tables_validate` covers them.
    Taxonomy {
        key: Jurisdiction::new(key),
        name: name.to_string(),
        labels,
        rules: default_rules(),
        default_tier: RiskTier::Low,
    }
}
