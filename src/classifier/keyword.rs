use anyhow::Result;
use async_trait::async_trait;

use crate::classifier::ClauseScorer;
use crate::models::LabelDistribution;
use crate::taxonomy::Taxonomy;

/// Lexical fallback scorer.
///
/// Counts keyword cues for every label and turns the counts into a
/// distribution with a softmax. Much weaker than a trained model, but it needs
/// no external resources and is fully deterministic. Labels without a built-in
/// cue list (e.g. from a custom taxonomy) are matched on the label's own words.
pub struct KeywordScorer {
    /// Softmax temperature; lower values make the top label more confident.
    temperature: f64,
}

impl KeywordScorer {
    pub fn new() -> Self {
        Self { temperature: 1.0 }
    }

    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature: if temperature > 0.0 { temperature } else { 1.0 },
        }
    }

    fn distribution(&self, text: &str, taxonomy: &Taxonomy) -> LabelDistribution {
        let lower = text.to_lowercase();
        let logits: Vec<f64> = taxonomy
            .labels()
            .iter()
            .map(|label| cue_hits(&lower, label) as f64 / self.temperature)
            .collect();

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        taxonomy
            .labels()
            .iter()
            .zip(exps)
            .map(|(label, e)| (label.clone(), e / total))
            .collect()
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClauseScorer for KeywordScorer {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution> {
        Ok(self.distribution(text, taxonomy))
    }
}

fn cue_hits(lower_text: &str, label: &str) -> usize {
    match builtin_cues(label) {
        Some(cues) => cues.iter().map(|cue| lower_text.matches(cue).count()).sum(),
        None => label
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.len() > 3)
            .map(|word| lower_text.matches(word).count())
            .sum(),
    }
}

fn builtin_cues(label: &str) -> Option<&'static [&'static str]> {
    let cues: &'static [&'static str] = match label {
        "Termination" => &["terminat", "cancel", "notice period"],
        "Payment" => &["payment", "pay ", "invoice", "fee", "price"],
        "Liability" => &["liable", "liability", "damages", "limitation of"],
        "Confidentiality" => &["confidential", "non-disclosure", "disclose"],
        "Intellectual Property" => &["intellectual property", "copyright", "patent", "trademark", "licen"],
        "Governing Law" => &["governed by", "governing law", "laws of", "construed in accordance"],
        "Dispute Resolution" => &["dispute", "arbitrat", "mediation", "court"],
        "Force Majeure" => &["force majeure", "beyond its control", "beyond the reasonable control", "act of god"],
        "Indemnification" => &["indemnif", "hold harmless", "defend"],
        "Warranties" => &["warrant", "represents", "as is"],
        "Deliverables" => &["deliver", "milestone", "specification", "acceptance"],
        "Term" => &["term of", "commence", "effective date", "remain in effect", "renew"],
        "Compliance" => &["comply", "compliance", "applicable law", "regulat"],
        "Registration" => &["regist"],
        "Stamp Duty" => &["stamp duty", "stamp", "stamped"],
        _ => return None,
    };
    Some(cues)
}
