use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::classifier::ClauseScorer;
use crate::models::LabelDistribution;
use crate::taxonomy::Taxonomy;

/// Scorer backed by a model served over HTTP.
///
/// Sends `POST {endpoint}` with `{"text", "jurisdiction", "labels"}` and
/// expects `{"scores": {"<label>": <probability>, ...}}` back. Non-2xx
/// responses and undecodable bodies are scorer errors.
pub struct RemoteScorer {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
    jurisdiction: &'a str,
    labels: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    scores: BTreeMap<String, f64>,
}

impl RemoteScorer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ClauseScorer for RemoteScorer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution> {
        let request = ScoreRequest {
            text,
            jurisdiction: taxonomy.key().as_str(),
            labels: taxonomy.labels(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", concat!("contract-risk/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("model endpoint {} returned {}", self.endpoint, response.status());
        }

        let body: ScoreResponse = response.json().await?;
        Ok(body.scores.into_iter().collect())
    }
}
