//! End-to-end contract analysis: segment → classify → score → aggregate → compare.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::aggregator::{summarize, AggregationConfig};
use crate::classifier::{ClauseScorer, Classifier};
use crate::compare::compare;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, ClassificationResult, ClauseAnalysis, Clause, Jurisdiction};
use crate::segmenter::Segmenter;
use crate::taxonomy::{JurisdictionSelector, Taxonomy, TaxonomyRegistry};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of scorer calls in flight at once.
    pub concurrency: usize,
    /// Attach a comparison when exactly two jurisdictions are analysed.
    pub compare: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            compare: true,
        }
    }
}

/// Cooperative cancellation shared between the caller and a running analysis.
///
/// Checked before each (clause, jurisdiction) classification starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress events emitted while an analysis runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Segmentation finished; `pairs` classifications will follow.
    Segmented { clauses: usize, pairs: usize },
    /// One (clause, jurisdiction) classification finished.
    Classified,
}

/// The analysis pipeline. Holds the taxonomies, the segmenter, and one
/// classifier per jurisdiction; all scorer calls share one concurrency limit.
pub struct Pipeline {
    registry: TaxonomyRegistry,
    segmenter: Segmenter,
    classifiers: HashMap<Jurisdiction, Classifier>,
    aggregation: AggregationConfig,
    config: PipelineConfig,
    limiter: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(registry: TaxonomyRegistry, segmenter: Segmenter, config: PipelineConfig) -> Self {
        let permits = config.concurrency.max(1);
        Self {
            registry,
            segmenter,
            classifiers: HashMap::new(),
            aggregation: AggregationConfig::default(),
            config,
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn with_aggregation(mut self, aggregation: AggregationConfig) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Use `scorer` for `jurisdiction`, replacing any earlier one.
    pub fn with_scorer(mut self, jurisdiction: Jurisdiction, scorer: Arc<dyn ClauseScorer>) -> Self {
        self.classifiers.insert(jurisdiction, Classifier::new(scorer));
        self
    }

    /// Give every registered jurisdiction its own scorer built by `make`.
    pub fn with_scorers<F>(mut self, make: F) -> Self
    where
        F: Fn(&Taxonomy) -> Arc<dyn ClauseScorer>,
    {
        for taxonomy in self.registry.iter() {
            self.classifiers
                .insert(taxonomy.key().clone(), Classifier::new(make(taxonomy)));
        }
        self
    }

    pub fn registry(&self) -> &TaxonomyRegistry {
        &self.registry
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn classifier(&self, jurisdiction: &Jurisdiction) -> Option<&Classifier> {
        self.classifiers.get(jurisdiction)
    }

    /// Analyse `text` under the jurisdictions picked by `selector`.
    pub async fn analyze_contract(
        &self,
        text: &str,
        selector: &JurisdictionSelector,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_contract_with(text, selector, &CancelFlag::new(), &|_| {})
            .await
    }

    /// Like [`Pipeline::analyze_contract`], with cancellation and progress
    /// reporting. A cancelled run returns [`AnalysisError::Cancelled`] and no
    /// partial result.
    pub async fn analyze_contract_with(
        &self,
        text: &str,
        selector: &JurisdictionSelector,
        cancel: &CancelFlag,
        on_progress: &(dyn Fn(Progress) + Sync),
    ) -> Result<AnalysisResult, AnalysisError> {
        let taxonomies = self.registry.resolve(selector)?;
        let mut classifiers = Vec::with_capacity(taxonomies.len());
        for taxonomy in &taxonomies {
            let classifier = self
                .classifiers
                .get(taxonomy.key())
                .ok_or_else(|| AnalysisError::NoScorer(taxonomy.key().clone()))?;
            classifiers.push((*taxonomy, classifier));
        }

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let clauses = self.segmenter.segment(text);
        let pairs = clauses.len() * classifiers.len();
        info!(
            clauses = clauses.len(),
            jurisdictions = classifiers.len(),
            selector = %selector,
            "segmented contract"
        );
        on_progress(Progress::Segmented {
            clauses: clauses.len(),
            pairs,
        });

        let mut pending = FuturesUnordered::new();
        for clause in &clauses {
            for (taxonomy, classifier) in &classifiers {
                pending.push(self.classify_pair(clause, taxonomy, classifier, cancel));
            }
        }

        let mut results: HashMap<(usize, Jurisdiction), ClassificationResult> = HashMap::with_capacity(pairs);
        while let Some(outcome) = pending.next().await {
            // Dropping `pending` on error abandons the outstanding calls.
            let result = outcome?;
            on_progress(Progress::Classified);
            results.insert((result.clause_id, result.jurisdiction.clone()), result);
        }
        drop(pending);

        let clause_analyses: Vec<ClauseAnalysis> = clauses
            .iter()
            .map(|clause| ClauseAnalysis {
                clause_id: clause.clause_id,
                text: clause.preview.clone(),
                classifications: taxonomies
                    .iter()
                    .filter_map(|t| results.remove(&(clause.clause_id, t.key().clone())))
                    .collect(),
            })
            .collect();

        let summary: Vec<_> = taxonomies
            .iter()
            .map(|t| {
                summarize(
                    clause_analyses.iter().flat_map(|a| a.classifications.iter()),
                    t.key(),
                    &self.aggregation,
                )
            })
            .collect();

        let comparison = match summary.as_slice() {
            [first, second] if self.config.compare => Some(compare(first, second)),
            _ => None,
        };

        let degraded = clause_analyses
            .iter()
            .flat_map(|a| a.classifications.iter())
            .filter(|r| r.is_degraded())
            .count();
        info!(clauses = clauses.len(), degraded, "analysis complete");

        Ok(AnalysisResult {
            total_clauses: clauses.len(),
            clause_analyses,
            summary,
            comparison,
        })
    }

    async fn classify_pair(
        &self,
        clause: &Clause,
        taxonomy: &Taxonomy,
        classifier: &Classifier,
        cancel: &CancelFlag,
    ) -> Result<ClassificationResult, AnalysisError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AnalysisError::Cancelled)?;

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let result = classifier.classify(clause, taxonomy).await;
        debug!(
            clause_id = clause.clause_id,
            jurisdiction = %taxonomy.key(),
            clause_type = %result.clause_type,
            risk = %result.risk_level,
            "classified clause"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;
    use crate::classifier::tests::{FailingScorer, FixedScorer, PanicOn};
    use crate::classifier::KeywordScorer;
    use crate::models::{LabelDistribution, RiskTier, UNKNOWN_CLAUSE_TYPE};
    use crate::segmenter::SegmenterConfig;

    const CONTRACT: &str = "\
SERVICES AGREEMENT

The Supplier shall indemnify, defend and hold harmless the Customer against all third party claims.

The Customer shall pay each invoice within thirty days; late payment fees accrue at one percent monthly.

Either party may terminate this Agreement for convenience on ninety days written notice to the other.

The laws of the State of Delaware govern this Agreement without regard to its conflict of laws rules.

All disputes shall be finally resolved by arbitration seated in Wilmington under the AAA rules.
";

    fn pipeline(config: PipelineConfig) -> Pipeline {
        let segmenter = Segmenter::new(SegmenterConfig::default()).unwrap();
        Pipeline::new(TaxonomyRegistry::builtin(), segmenter, config)
    }

    /// Fails for clauses whose text contains `needle`.
    struct FailOn {
        needle: &'static str,
    }

    #[async_trait]
    impl ClauseScorer for FailOn {
        fn name(&self) -> &str {
            "fail-on"
        }

        async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution> {
            if text.contains(self.needle) {
                anyhow::bail!("inference crashed");
            }
            KeywordScorer::new().score(text, taxonomy).await
        }
    }

    /// Records the largest number of `score` calls in flight at once.
    #[derive(Default)]
    struct PeakTracker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ClauseScorer for PeakTracker {
        fn name(&self) -> &str {
            "peak-tracker"
        }

        async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            KeywordScorer::new().score(text, taxonomy).await
        }
    }

    /// Counts calls and cancels the shared flag after the first one.
    struct CancelAfterFirst {
        cancel: CancelFlag,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ClauseScorer for CancelAfterFirst {
        fn name(&self) -> &str {
            "cancel-after-first"
        }

        async fn score(&self, text: &str, taxonomy: &Taxonomy) -> Result<LabelDistribution> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
            KeywordScorer::new().score(text, taxonomy).await
        }
    }

    #[tokio::test]
    async fn test_both_jurisdictions_end_to_end() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorers(|_| Arc::new(KeywordScorer::new()) as Arc<dyn ClauseScorer>);
        let result = pipeline
            .analyze_contract(CONTRACT, &JurisdictionSelector::All)
            .await
            .unwrap();

        assert_eq!(result.total_clauses, 5);
        assert_eq!(result.clause_analyses.len(), 5);
        for (i, analysis) in result.clause_analyses.iter().enumerate() {
            assert_eq!(analysis.clause_id, i + 1);
            let keys: Vec<&str> = analysis
                .classifications
                .iter()
                .map(|r| r.jurisdiction.as_str())
                .collect();
            assert_eq!(keys, vec!["us", "indian"]);
            for r in &analysis.classifications {
                assert!((r.all_scores.sum() - 1.0).abs() < 1e-9);
                assert_eq!(r.all_scores.get(&r.clause_type), Some(r.confidence));
            }
        }

        let order: Vec<&str> = result.summary.iter().map(|s| s.jurisdiction.as_str()).collect();
        assert_eq!(order, vec!["us", "indian"]);
        for summary in result.summary.iter() {
            assert_eq!(summary.risk_distribution.total(), 5);
        }
        let comparison = result.comparison.expect("two jurisdictions are compared");
        assert_eq!(comparison.first.as_str(), "us");
        assert_eq!(comparison.second.as_str(), "indian");
    }

    #[tokio::test]
    async fn test_single_jurisdiction_has_no_comparison() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorers(|_| Arc::new(KeywordScorer::new()) as Arc<dyn ClauseScorer>);
        let us = JurisdictionSelector::One(Jurisdiction::new("us"));
        let result = pipeline.analyze_contract(CONTRACT, &us).await.unwrap();
        assert_eq!(result.summary.len(), 1);
        assert!(result.comparison.is_none());
        assert!(result
            .clause_analyses
            .iter()
            .all(|a| a.classifications.len() == 1));
    }

    #[tokio::test]
    async fn test_one_failing_clause_degrades_only_that_clause() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorer(Jurisdiction::new("us"), Arc::new(FailOn { needle: "terminate" }));
        let us = Jurisdiction::new("us");
        let result = pipeline
            .analyze_contract(CONTRACT, &JurisdictionSelector::One(us.clone()))
            .await
            .unwrap();

        let results: Vec<_> = result.results_for(&us).collect();
        assert_eq!(results.len(), 5);
        let unknown: Vec<_> = results
            .iter()
            .filter(|r| r.clause_type == UNKNOWN_CLAUSE_TYPE)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].clause_id, 3);
        assert_eq!(unknown[0].confidence, 0.0);
        assert_eq!(unknown[0].risk_level, RiskTier::Medium);
        assert_eq!(
            result.summary_for(&us).unwrap().clause_types.get(UNKNOWN_CLAUSE_TYPE),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn test_panicking_scorer_degrades_only_that_clause() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorer(Jurisdiction::new("us"), Arc::new(PanicOn { needle: "terminate" }));
        let us = Jurisdiction::new("us");
        let result = pipeline
            .analyze_contract(CONTRACT, &JurisdictionSelector::One(us.clone()))
            .await
            .unwrap();

        let results: Vec<_> = result.results_for(&us).collect();
        assert_eq!(results.len(), 5);
        let degraded: Vec<_> = results.iter().filter(|r| r.is_degraded()).collect();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].clause_id, 3);
        assert_eq!(degraded[0].clause_type, UNKNOWN_CLAUSE_TYPE);
        assert_eq!(degraded[0].confidence, 0.0);
        assert_eq!(degraded[0].risk_level, RiskTier::Medium);
    }

    #[tokio::test]
    async fn test_scorer_calls_respect_concurrency_limit() {
        let tracker = Arc::new(PeakTracker::default());
        let config = PipelineConfig {
            concurrency: 2,
            ..PipelineConfig::default()
        };
        let pipeline = pipeline(config).with_scorers(|_| tracker.clone() as Arc<dyn ClauseScorer>);
        let result = pipeline
            .analyze_contract(CONTRACT, &JurisdictionSelector::All)
            .await
            .unwrap();

        assert_eq!(result.total_clauses, 5);
        assert_eq!(tracker.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_jurisdiction_is_fatal() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorers(|_| Arc::new(KeywordScorer::new()) as Arc<dyn ClauseScorer>);
        let selector = JurisdictionSelector::One(Jurisdiction::new("germany"));
        let err = pipeline.analyze_contract(CONTRACT, &selector).await.unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownJurisdiction(ref k) if k == "germany"));
    }

    #[tokio::test]
    async fn test_missing_scorer_is_reported() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorer(Jurisdiction::new("us"), Arc::new(KeywordScorer::new()));
        let err = pipeline
            .analyze_contract(CONTRACT, &JurisdictionSelector::All)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoScorer(ref k) if k.as_str() == "indian"));
    }

    #[tokio::test]
    async fn test_empty_input_gives_empty_summaries() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorers(|_| Arc::new(FailingScorer) as Arc<dyn ClauseScorer>);
        let result = pipeline
            .analyze_contract("   \n\n  ", &JurisdictionSelector::All)
            .await
            .unwrap();
        assert_eq!(result.total_clauses, 0);
        assert!(result.clause_analyses.is_empty());
        assert_eq!(result.summary.len(), 2);
        for summary in result.summary.iter() {
            assert_eq!(summary.risk_distribution.total(), 0);
            assert!(summary.clause_types.is_empty());
            assert_eq!(summary.overall_risk, RiskTier::Low);
        }
    }

    #[tokio::test]
    async fn test_fixed_scorer_drives_overall_risk() {
        let pipeline = pipeline(PipelineConfig::default()).with_scorers(|_| {
            Arc::new(FixedScorer {
                label: "Liability".into(),
                mass: 0.95,
            }) as Arc<dyn ClauseScorer>
        });
        let result = pipeline
            .analyze_contract(CONTRACT, &JurisdictionSelector::All)
            .await
            .unwrap();
        for summary in result.summary.iter() {
            assert_eq!(summary.risk_distribution.high, 5);
            assert_eq!(summary.overall_risk, RiskTier::High);
        }
        let comparison = result.comparison.unwrap();
        assert!(!comparison.risk_diverges);
        assert!(comparison.unique_to_first.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_returns_no_partial_result() {
        let cancel = CancelFlag::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let scorer = Arc::new(CancelAfterFirst {
            cancel: cancel.clone(),
            calls: calls.clone(),
        });
        let config = PipelineConfig {
            concurrency: 1,
            ..PipelineConfig::default()
        };
        let pipeline = pipeline(config).with_scorer(Jurisdiction::new("us"), scorer);
        let selector = JurisdictionSelector::One(Jurisdiction::new("us"));

        let err = pipeline
            .analyze_contract_with(CONTRACT, &selector, &cancel, &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let pipeline = pipeline(PipelineConfig::default())
            .with_scorers(|_| Arc::new(KeywordScorer::new()) as Arc<dyn ClauseScorer>);
        let classified = AtomicUsize::new(0);
        let announced = AtomicUsize::new(0);
        pipeline
            .analyze_contract_with(CONTRACT, &JurisdictionSelector::All, &CancelFlag::new(), &|p| match p {
                Progress::Segmented { pairs, .. } => announced.store(pairs, Ordering::SeqCst),
                Progress::Classified => {
                    classified.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();
        assert_eq!(announced.load(Ordering::SeqCst), 10);
        assert_eq!(classified.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_repeat_runs_are_identical() {
        let pipeline = pipeline(PipelineConfig {
            concurrency: 8,
            ..PipelineConfig::default()
        })
        .with_scorers(|_| Arc::new(KeywordScorer::new()) as Arc<dyn ClauseScorer>);
        let a = pipeline.analyze_contract(CONTRACT, &JurisdictionSelector::All).await.unwrap();
        let b = pipeline.analyze_contract(CONTRACT, &JurisdictionSelector::All).await.unwrap();
        assert_eq!(a, b);
    }
}
