use std::path::PathBuf;

use clap::Parser;

use contract_risk::models::RiskTier;
use contract_risk::taxonomy::JurisdictionSelector;

#[derive(Parser, Debug)]
#[command(
    name = "contract-risk",
    about = "Classify contract clauses and score their risk across jurisdictions",
    version
)]
pub struct Cli {
    /// Contract text file (UTF-8); `-` reads stdin
    #[arg(default_value = "-")]
    pub path: PathBuf,

    /// Jurisdiction to analyse under: a registered key (us, indian, ...) or `both`
    #[arg(short, long, default_value = "both", value_name = "KEY")]
    pub jurisdiction: JurisdictionSelector,

    /// Config file [default: ./.contract-risk/config.toml, fallback ~/.config/contract-risk/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Maximum in-flight clause classifications (overrides config)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// HTTP scoring endpoint tried before the keyword scorer (overrides config)
    #[arg(long, value_name = "URL")]
    pub model_endpoint: Option<String>,

    /// Skip the cross-jurisdiction comparison
    #[arg(long)]
    pub no_compare: bool,

    /// Print prose summaries after the tables
    #[arg(long)]
    pub narrative: bool,

    /// Exit with status 1 when any jurisdiction's overall risk reaches this tier
    #[arg(long, value_name = "TIER")]
    pub fail_on: Option<RiskTier>,

    /// Show every clause (not just medium/high) and log progress
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary lines
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}
