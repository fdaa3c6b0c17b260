use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::aggregator::AggregationConfig;
use crate::models::{Jurisdiction, RiskTier};
use crate::pipeline::PipelineConfig;
use crate::segmenter::SegmenterConfig;
use crate::taxonomy::{RiskRule, Taxonomy, TaxonomyRegistry};

/// Root configuration structure, deserialized from `.contract-risk/config.toml`.
///
/// Every section is optional; missing values fall back to the built-in
/// defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmenter: SegmenterConfig,
    pub aggregation: AggregationConfig,
    pub pipeline: PipelineConfig,
    pub model: ModelConfig,
    /// Threshold overrides for registered taxonomies, keyed by jurisdiction.
    pub risk: BTreeMap<String, ThresholdOverrides>,
    /// Additional (or replacement) taxonomies.
    pub jurisdictions: Vec<JurisdictionConfig>,
}

/// Where clause scores come from.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// HTTP model endpoint tried before the keyword fallback.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Softmax temperature of the keyword fallback scorer.
    pub keyword_temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
            keyword_temperature: 1.0,
        }
    }
}

/// `[risk.<key>]`: replaces the confidence threshold of a tier's bucket.
#[derive(Debug, Default, Deserialize)]
pub struct ThresholdOverrides {
    pub high: Option<f64>,
    pub medium: Option<f64>,
}

/// `[[jurisdictions]]`: a taxonomy defined in configuration.
#[derive(Debug, Deserialize)]
pub struct JurisdictionConfig {
    pub key: String,
    pub name: Option<String>,
    pub clause_types: Vec<String>,
    /// Tier → bucket. Labels in no bucket score low.
    #[serde(default)]
    pub risk_levels: BTreeMap<RiskTier, RiskBucket>,
}

#[derive(Debug, Deserialize)]
pub struct RiskBucket {
    pub clause_types: Vec<String>,
    pub confidence_threshold: f64,
}

impl JurisdictionConfig {
    fn to_taxonomy(&self) -> Result<Taxonomy> {
        // Highest tier first so the rule table reads top-down.
        let rules = self
            .risk_levels
            .iter()
            .rev()
            .map(|(tier, bucket)| RiskRule {
                tier: *tier,
                threshold: bucket.confidence_threshold,
                labels: bucket.clause_types.clone(),
            })
            .collect();
        let name = self.name.clone().unwrap_or_else(|| self.key.clone());
        Ok(Taxonomy::new(
            Jurisdiction::new(&self.key),
            name,
            self.clause_types.clone(),
            rules,
        )?)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<base_dir>/.contract-risk/config.toml`
/// 3. `~/.config/contract-risk/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local_config = base_dir.join(".contract-risk").join("config.toml");
    if local_config.exists() {
        return read_config(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("contract-risk")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

/// Built-in taxonomies plus the configured jurisdictions and threshold overrides.
pub fn build_registry(config: &Config) -> Result<TaxonomyRegistry> {
    let mut registry = TaxonomyRegistry::builtin();

    for jurisdiction in &config.jurisdictions {
        let taxonomy = jurisdiction
            .to_taxonomy()
            .with_context(|| format!("Invalid [[jurisdictions]] entry '{}'", jurisdiction.key))?;
        registry.register(taxonomy);
    }

    for (key, overrides) in &config.risk {
        let mut taxonomy = registry
            .taxonomy_for(key)
            .with_context(|| format!("[risk.{key}] names an unregistered jurisdiction"))?
            .clone();
        if let Some(high) = overrides.high {
            taxonomy = taxonomy.with_threshold(RiskTier::High, high)?;
        }
        if let Some(medium) = overrides.medium {
            taxonomy = taxonomy.with_threshold(RiskTier::Medium, medium)?;
        }
        registry.register(taxonomy);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::score_risk;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::default();
        assert_eq!(cfg.segmenter.min_clauses, 5);
        assert_eq!(cfg.pipeline.concurrency, 4);
        assert!(cfg.pipeline.compare);
        assert!(cfg.model.endpoint.is_none());
        let registry = build_registry(&cfg).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_partial_sections() {
        let cfg: Config = toml::from_str(
            r#"
[segmenter]
min_clauses = 3

[pipeline]
concurrency = 16
"#,
        )
        .unwrap();
        assert_eq!(cfg.segmenter.min_clauses, 3);
        assert_eq!(cfg.segmenter.min_clause_chars, 50);
        assert_eq!(cfg.pipeline.concurrency, 16);
        assert_eq!(cfg.aggregation.high_ratio, 0.3);
    }

    #[test]
    fn test_threshold_override() {
        let cfg: Config = toml::from_str(
            r#"
[risk.indian]
high = 0.85
"#,
        )
        .unwrap();
        let registry = build_registry(&cfg).unwrap();
        let indian = registry.taxonomy_for("indian").unwrap();
        let us = registry.taxonomy_for("us").unwrap();
        assert_eq!(score_risk("Liability", 0.8, indian), RiskTier::Medium);
        assert_eq!(score_risk("Liability", 0.8, us), RiskTier::High);
    }

    #[test]
    fn test_override_for_unknown_jurisdiction_fails() {
        let cfg: Config = toml::from_str("[risk.mars]\nhigh = 0.9\n").unwrap();
        assert!(build_registry(&cfg).is_err());
    }

    #[test]
    fn test_custom_jurisdiction() {
        let cfg: Config = toml::from_str(
            r#"
[[jurisdictions]]
key = "germany"
name = "German Civil Code"
clause_types = ["Liability", "Termination", "Data Protection", "Works Council"]

[jurisdictions.risk_levels.high]
clause_types = ["Liability", "Data Protection"]
confidence_threshold = 0.8

[jurisdictions.risk_levels.medium]
clause_types = ["Termination"]
confidence_threshold = 0.6
"#,
        )
        .unwrap();
        let registry = build_registry(&cfg).unwrap();
        assert_eq!(registry.len(), 3);
        let germany = registry.taxonomy_for("germany").unwrap();
        assert_eq!(germany.name(), "German Civil Code");
        assert_eq!(germany.rules()[0].tier, RiskTier::High);
        assert_eq!(score_risk("Data Protection", 0.81, germany), RiskTier::High);
        assert_eq!(score_risk("Data Protection", 0.8, germany), RiskTier::Medium);
        assert_eq!(score_risk("Works Council", 0.99, germany), RiskTier::Low);
    }

    #[test]
    fn test_invalid_custom_jurisdiction() {
        let cfg: Config = toml::from_str(
            r#"
[[jurisdictions]]
key = "broken"
clause_types = ["Term"]

[jurisdictions.risk_levels.high]
clause_types = ["Liability"]
confidence_threshold = 0.8
"#,
        )
        .unwrap();
        let err = build_registry(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("unknown label 'Liability'"));
    }

    #[test]
    fn test_load_override_path() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "[model]\nendpoint = \"http://localhost:8080/score\"\ntimeout_secs = 3").unwrap();
        let cfg = load_config(Path::new("."), Some(f.path())).unwrap();
        assert_eq!(cfg.model.endpoint.as_deref(), Some("http://localhost:8080/score"));
        assert_eq!(cfg.model.timeout_secs, 3);
    }

    #[test]
    fn test_load_from_base_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".contract-risk")).unwrap();
        std::fs::write(
            dir.path().join(".contract-risk").join("config.toml"),
            "[pipeline]\ncompare = false\n",
        )
        .unwrap();
        let cfg = load_config(dir.path(), None).unwrap();
        assert!(!cfg.pipeline.compare);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "[pipeline\nconcurrency = ").unwrap();
        assert!(load_config(Path::new("."), Some(f.path())).is_err());
    }
}
