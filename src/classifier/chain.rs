use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::classifier::ClauseScorer;
use crate::models::LabelDistribution;
use crate::taxonomy::Taxonomy;

/// Tries scorers in order (primary first) and returns the first success.
pub struct ScorerChain {
    scorers: Vec<Arc<dyn ClauseScorer>>,
    name: String,
}

impl ScorerChain {
    pub fn new(scorers: Vec<Arc<dyn ClauseScorer>>) -> Self {
        let name = scorers
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join("→");
        Self { scorers, name }
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }
}

#[async_trait]
impl ClauseScorer for ScorerChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution> {
        let mut last_err = anyhow!("scorer chain is empty");
        for scorer in &self.scorers {
            match scorer.score(text, taxonomy).await {
                Ok(dist) => return Ok(dist),
                Err(e) => {
                    debug!(scorer = scorer.name(), error = %e, "scorer failed, trying next");
                    last_err = e.context(format!("{} scorer failed", scorer.name()));
                }
            }
        }
        Err(last_err)
    }
}
