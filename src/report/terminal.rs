use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::models::{
    AnalysisResult, ClassificationResult, ClauseAnalysis, ComparisonResult, Jurisdiction,
    JurisdictionSummary, RiskTier,
};

/// Render a colored terminal report.
///
/// Without `verbose` only medium and high risk clauses are tabled; degraded
/// classifications are always shown.
pub fn render(result: &AnalysisResult, source: &str, verbose: bool, quiet: bool) -> Result<()> {
    if quiet {
        for summary in &result.summary {
            let dist = &summary.risk_distribution;
            println!(
                "{}: {}  High: {}  Medium: {}  Low: {}",
                summary.jurisdiction.as_str().to_uppercase(),
                colored_tier(summary.overall_risk),
                dist.high.to_string().red(),
                dist.medium.to_string().yellow(),
                dist.low.to_string().green(),
            );
        }
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "contract-risk".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Analysing: {}", source);
    println!(" Clauses  : {}\n", result.total_clauses);

    if result.total_clauses == 0 {
        println!(" {} No clauses found in the input.\n", "[WARN]".yellow().bold());
        return Ok(());
    }

    for summary in &result.summary {
        render_summary_box(summary);

        let rows = rows_for(&result.clause_analyses, &summary.jurisdiction, verbose);
        if rows.is_empty() {
            println!(" {} No medium or high risk clauses.\n", "[PASS]".green().bold());
        } else {
            let heading = if verbose {
                "All clauses:"
            } else {
                "Clauses requiring attention:"
            };
            println!(" {} {}\n", "[CLAUSES]".cyan().bold(), heading);
            render_table(&rows);
            println!();
        }
    }

    if let Some(comparison) = &result.comparison {
        render_comparison(comparison);
    }

    Ok(())
}

fn render_summary_box(summary: &JurisdictionSummary) {
    let dist = &summary.risk_distribution;
    let title = format!("{} JURISDICTION", summary.jurisdiction.as_str().to_uppercase());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", title.bold());
    println!(
        " │  {:<48} │",
        format!("Overall risk       : {}", summary.overall_risk.to_string().to_uppercase())
    );
    println!(
        " │  {:<48} │",
        format!("{}  High            : {:>4}", "✗".red(), dist.high)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Medium          : {:>4}", "⚠".yellow(), dist.medium)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Low             : {:>4}", "✓".green(), dist.low)
    );
    println!(
        " │  {:<48} │",
        format!("Top clause types   : {}", top_clause_types(summary))
    );
    println!(" └────────────────────────────────────────────────────┘\n");
}

fn render_table(rows: &[(&ClauseAnalysis, &ClassificationResult)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Clause Type").add_attribute(Attribute::Bold),
            Cell::new("Confidence").add_attribute(Attribute::Bold),
            Cell::new("Risk").add_attribute(Attribute::Bold),
            Cell::new("Preview").add_attribute(Attribute::Bold),
        ]);

    for (analysis, result) in rows {
        let clause_type = if result.is_degraded() {
            format!("{} (degraded)", result.clause_type)
        } else {
            result.clause_type.clone()
        };

        table.add_row(vec![
            Cell::new(analysis.clause_id).set_alignment(CellAlignment::Right),
            Cell::new(clause_type),
            Cell::new(format!("{:.3}", result.confidence)).set_alignment(CellAlignment::Right),
            Cell::new(result.risk_level.to_string())
                .fg(tier_color(result.risk_level))
                .set_alignment(CellAlignment::Center),
            Cell::new(&analysis.text),
        ]);
    }

    println!("{}", table);
}

fn render_comparison(comparison: &ComparisonResult) {
    let first = comparison.first.as_str().to_uppercase();
    let second = comparison.second.as_str().to_uppercase();

    println!(" {} {} vs {}\n", "[COMPARE]".cyan().bold(), first, second);

    let verdict = if comparison.risk_diverges {
        "diverges".red().bold()
    } else {
        "agrees".green().bold()
    };
    println!(
        "   Overall risk {}: {} {} / {} {}",
        verdict,
        first,
        colored_tier(comparison.first_overall_risk),
        second,
        colored_tier(comparison.second_overall_risk),
    );
    println!(
        "   Only under {:<8}: {}",
        first,
        join_or_dash(comparison.unique_to_first.iter())
    );
    println!(
        "   Only under {:<8}: {}\n",
        second,
        join_or_dash(comparison.unique_to_second.iter())
    );
}

fn rows_for<'a>(
    analyses: &'a [ClauseAnalysis],
    jurisdiction: &Jurisdiction,
    verbose: bool,
) -> Vec<(&'a ClauseAnalysis, &'a ClassificationResult)> {
    analyses
        .iter()
        .filter_map(|a| a.result_for(jurisdiction).map(|r| (a, r)))
        .filter(|(_, r)| verbose || r.is_degraded() || r.risk_level >= RiskTier::Medium)
        .collect()
}

fn top_clause_types(summary: &JurisdictionSummary) -> String {
    let mut pairs: Vec<(&String, &usize)> = summary.clause_types.iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(a.1));

    let top: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(label, count)| format!("{} ({})", label, count))
        .collect();

    if top.is_empty() {
        "-".to_string()
    } else {
        top.join(", ")
    }
}

fn join_or_dash<'a>(labels: impl Iterator<Item = &'a String>) -> String {
    let joined = labels.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

fn tier_color(tier: RiskTier) -> Color {
    match tier {
        RiskTier::High => Color::Red,
        RiskTier::Medium => Color::Yellow,
        RiskTier::Low => Color::Green,
    }
}

fn colored_tier(tier: RiskTier) -> ColoredString {
    let label = tier.to_string().to_uppercase();
    match tier {
        RiskTier::High => label.red().bold(),
        RiskTier::Medium => label.yellow(),
        RiskTier::Low => label.green(),
    }
}
