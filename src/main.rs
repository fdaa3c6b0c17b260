//! `contract-risk` — classify contract clauses per jurisdiction and score their risk.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`contract_risk::config::load_config`]) and build the taxonomy registry.
//! 3. Read the contract text (file or stdin).
//! 4. Run the analysis pipeline with a progress bar; Ctrl-C cancels it.
//! 5. Render the requested report, plus narratives with `--narrative`.
//! 6. Exit `0`, or `1` when `--fail-on` is reached.

mod cli;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, ReportFormat};
use contract_risk::classifier::{ClauseScorer, KeywordScorer, RemoteScorer, ScorerChain};
use contract_risk::config::{build_registry, load_config, ModelConfig};
use contract_risk::models::{AnalysisResult, Jurisdiction};
use contract_risk::narrative::{Narrator, RuleBasedNarrator};
use contract_risk::report;
use contract_risk::segmenter::Segmenter;
use contract_risk::{CancelFlag, Pipeline, Progress};

/// Input formats that need text extraction before they can be analysed.
const UNSUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "rtf", "odt"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    let mut config = load_config(&cwd, cli.config.as_deref())?;
    if let Some(concurrency) = cli.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if cli.no_compare {
        config.pipeline.compare = false;
    }
    if let Some(endpoint) = &cli.model_endpoint {
        config.model.endpoint = Some(endpoint.clone());
    }

    let registry = build_registry(&config)?;
    let (text, source) = read_contract(&cli.path)?;

    let segmenter = Segmenter::new(config.segmenter)?;
    let pipeline = Pipeline::new(registry, segmenter, config.pipeline)
        .with_aggregation(config.aggregation);
    let pipeline = attach_scorers(pipeline, &config.model)?;

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb
    };
    let on_progress = |event: Progress| match event {
        Progress::Segmented { pairs, .. } => pb.set_length(pairs as u64),
        Progress::Classified => pb.inc(1),
    };

    let result = pipeline
        .analyze_contract_with(&text, &cli.jurisdiction, &cancel, &on_progress)
        .await;
    pb.finish_and_clear();
    let result = result?;

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(&result, &source, cli.verbose, cli.quiet)?;
            if cli.narrative {
                print_narratives(&result);
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    // Exit code: 1 if any jurisdiction reaches the --fail-on tier
    if let Some(threshold) = cli.fail_on {
        let failing = result
            .summary
            .iter()
            .any(|s| s.overall_risk >= threshold);
        if failing {
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Read UTF-8 contract text from `path`, or stdin when `path` is `-`.
/// Returns the text and a display name for the source.
fn read_contract(path: &Path) -> Result<(String, String)> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read contract from stdin")?;
        return Ok((text, "<stdin>".to_string()));
    }

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            bail!(
                "{} is a .{} document; extract its text to a UTF-8 file first",
                path.display(),
                ext
            );
        }
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))?;
    Ok((text, path.display().to_string()))
}

/// Keyword scoring, behind the HTTP model when an endpoint is configured.
fn build_scorer(model: &ModelConfig) -> Result<Arc<dyn ClauseScorer>> {
    let keyword: Arc<dyn ClauseScorer> =
        Arc::new(KeywordScorer::with_temperature(model.keyword_temperature));

    let Some(endpoint) = &model.endpoint else {
        return Ok(keyword);
    };

    let remote: Arc<dyn ClauseScorer> = Arc::new(
        RemoteScorer::new(endpoint.clone(), Duration::from_secs(model.timeout_secs))
            .with_context(|| format!("Failed to build HTTP client for {endpoint}"))?,
    );
    Ok(Arc::new(ScorerChain::new(vec![remote, keyword])))
}

/// Give every registered jurisdiction its own scorer instance.
fn attach_scorers(mut pipeline: Pipeline, model: &ModelConfig) -> Result<Pipeline> {
    let keys: Vec<Jurisdiction> = pipeline.registry().keys().cloned().collect();
    for key in keys {
        let scorer = build_scorer(model)?;
        info!(jurisdiction = %key, scorer = scorer.name(), "scorer ready");
        pipeline = pipeline.with_scorer(key, scorer);
    }
    Ok(pipeline)
}

fn print_narratives(result: &AnalysisResult) {
    let narrator = RuleBasedNarrator;
    for summary in &result.summary {
        println!("{}\n", narrator.explain_summary(summary, &result.clause_analyses));
    }
    if let Some(comparison) = &result.comparison {
        println!("{}\n", narrator.explain_comparison(comparison));
    }
}
