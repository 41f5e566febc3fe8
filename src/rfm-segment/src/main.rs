//! rfm-segment — RFM customer segmentation over a per-customer metrics table.
//!
//! Loads the metrics table, scores and segments every customer, prints a
//! segment summary and writes the segmented customers and analysis to disk.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rfm_core::config::{AppConfig, LoggingConfig, ReportConfig};
use rfm_core::{Metric, RfmScore, SCORE_LEVELS};
use rfm_reporting::{
    load_metrics, write_outputs, write_segment_details, ExportFormat, SegmentAnalysis,
};
use rfm_segmentation::classifier::{self, FALLTHROUGH_RULE, RULES};
use rfm_segmentation::SegmentationEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rfm-segment")]
#[command(about = "RFM scoring and behavioral segmentation of customers")]
#[command(version)]
struct Cli {
    /// TOML config file; RFM_SEGMENT__* environment variables still apply
    #[arg(long, global = true, env = "RFM_SEGMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON (overrides config)
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score, segment and report a customer metrics table
    Run {
        /// Metrics table (.csv or .json); overrides config
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Report directory; overrides config
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output formats, comma separated; overrides config
        #[arg(long, value_delimiter = ',')]
        formats: Vec<String>,

        /// Also write one <segment>_details.csv per segment
        #[arg(long, default_value_t = false)]
        segment_details: bool,
    },
    /// Classify a single (r, f, m) score triple
    Classify { r: u8, f: u8, m: u8 },
    /// Print the ordered segment rule table
    Rules,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load config")?;
    init_tracing(&config.logging, cli.json_logs);

    match cli.command {
        Command::Run {
            input,
            output_dir,
            formats,
            segment_details,
        } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&config.input.path));
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.output.dir));
            let formats = if formats.is_empty() {
                config.output.formats.clone()
            } else {
                formats
            };
            let formats = formats
                .iter()
                .map(|f| ExportFormat::parse(f))
                .collect::<Result<Vec<_>, _>>()?;
            let segment_details = segment_details || config.output.segment_details;
            run_pipeline(&config, input, output_dir, &formats, segment_details)
        }
        Command::Classify { r, f, m } => run_classify(r, f, m),
        Command::Rules => {
            print_rules();
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig, json_logs: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter)),
        )
        .with_writer(std::io::stderr);

    if json_logs || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Full pipeline: load, score, classify, analyse, export.
fn run_pipeline(
    config: &AppConfig,
    input: PathBuf,
    output_dir: PathBuf,
    formats: &[ExportFormat],
    segment_details: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    info!(input = %input.display(), "RFM segmentation starting");

    let population = load_metrics(&input)
        .with_context(|| format!("Failed to load metrics from {}", input.display()))?;

    let engine = SegmentationEngine::new(&config.scoring)?;
    let segmented = engine.run(population)?;
    let analysis = SegmentAnalysis::from_records(&segmented);

    print_summary(&analysis, &config.report);

    let mut written = write_outputs(&output_dir, formats, &segmented, &analysis)
        .with_context(|| format!("Failed to write reports to {}", output_dir.display()))?;
    if segment_details {
        written.extend(
            write_segment_details(&output_dir, &segmented).with_context(|| {
                format!("Failed to write segment details to {}", output_dir.display())
            })?,
        );
    }

    println!("\n=== Outputs ===");
    for path in &written {
        println!("  {}", path.display());
    }

    info!(
        customers = analysis.total_customers,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "RFM segmentation complete"
    );
    Ok(())
}

fn print_summary(analysis: &SegmentAnalysis, report: &ReportConfig) {
    let currency = &report.currency_symbol;

    println!("=== RFM Segmentation ===");
    println!("Customers:            {}", analysis.total_customers);
    println!("Total revenue:        {currency}{:.2}", analysis.total_revenue);
    println!("Avg customer value:   {currency}{:.2}", analysis.avg_customer_value);
    println!("Repeat customer rate: {:.1}%", analysis.repeat_rate);

    println!("\n=== Score Distribution ===");
    println!("{:<10} {}", "score", (1..=SCORE_LEVELS).map(|s| format!("{s:>8}")).collect::<String>());
    for metric in Metric::ALL {
        let counts = analysis.score_distribution.for_metric(metric);
        let cells: String = counts.iter().map(|c| format!("{c:>8}")).collect();
        println!("{:<10} {cells}", metric.to_string());
    }

    println!("\n=== Segments (by average spend) ===");
    println!(
        "{:<22} {:>9} {:>7} {:>14} {:>10} {:>9}  {}",
        "segment", "customers", "cust%", "revenue", "avg spend", "revenue%", "top state"
    );
    for s in &analysis.segments {
        println!(
            "{:<22} {:>9} {:>6.1}% {:>14.2} {:>10.2} {:>8.1}%  {}",
            s.segment.as_str(),
            s.customer_count,
            s.customer_pct,
            s.total_revenue,
            s.avg_spent,
            s.revenue_pct,
            s.top_state.as_deref().unwrap_or("N/A")
        );
    }

    println!("\n=== Top {} Segments by Revenue ===", report.top_segments);
    for s in analysis.top_by_revenue(report.top_segments) {
        println!(
            "  {}: {:.1}% of revenue, {:.1}% of customers",
            s.segment, s.revenue_pct, s.customer_pct
        );
        println!("    {}", s.segment.recommendation());
    }

    let states = analysis.top_states(report.top_states);
    if !states.is_empty() {
        println!("\n=== Top {} States ===", states.len());
        for state in states {
            println!(
                "  {}: {} customers ({:.1}%), top segment {}",
                state.state, state.customers, state.customer_pct, state.top_segment
            );
        }
    }

    let at_risk = analysis.at_risk();
    if at_risk.customers > 0 {
        println!("\n=== At Risk ===");
        println!(
            "  Customers: {} ({:.1}%)",
            at_risk.customers, at_risk.customer_pct
        );
        println!(
            "  Revenue at risk: {currency}{:.2} ({:.1}%)",
            at_risk.revenue, at_risk.revenue_pct
        );
    }
}

fn run_classify(r: u8, f: u8, m: u8) -> anyhow::Result<()> {
    let segment = classifier::classify(r, f, m)?;
    let rule = classifier::matching_rule(
        RfmScore::parse("r", r)?,
        RfmScore::parse("f", f)?,
        RfmScore::parse("m", m)?,
    );
    let (number, condition) = rule
        .map(|rule| (rule.number, rule.condition))
        .unwrap_or(FALLTHROUGH_RULE);

    println!("Segment: {segment}");
    println!("Rule {number}: {condition}");
    println!("  {}", segment.description());
    println!("  Suggested action: {}", segment.recommendation());
    Ok(())
}

fn print_rules() {
    println!("{:>4}  {:<32} segment", "rule", "condition");
    for rule in RULES.iter() {
        println!("{:>4}  {:<32} {}", rule.number, rule.condition, rule.segment);
    }
    let (number, condition) = FALLTHROUGH_RULE;
    println!("{:>4}  {:<32} {}", number, condition, rfm_core::Segment::Other);
}
