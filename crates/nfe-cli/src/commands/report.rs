//! Report command - aggregate many NF-e documents into one sales report.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use nfe_core::models::report::{BatchReport, RenderedReport};
use nfe_core::{
    Aggregation, CancellationToken, DocumentFailure, InputError, ReportFormatter, RunReport,
    generate_report,
};

use super::load_config;

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// Input documents (.xml), archives (.zip) or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Number of parallel workers (default: from config, 0 = all cores)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Fail when any input or document could not be processed
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text report
    Text,
    /// JSON output
    Json,
    /// CSV rows
    Csv,
}

/// JSON document: the rendered report plus run statistics.
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a RenderedReport,
    submitted: usize,
    succeeded: usize,
    failures: &'a [DocumentFailure],
    warnings: Vec<String>,
}

pub async fn run(args: ReportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.workers = jobs;
    }

    let inputs = expand_patterns(&args.inputs)?;
    debug!("Resolved {} input paths", inputs.len());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {}", e))?
            .progress_chars("=>-"),
    );

    // Ctrl-C stops workers between documents.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing documents in progress");
            on_interrupt.cancel();
        }
    });

    let bar = pb.clone();
    let run_config = config.clone();
    let run = tokio::task::spawn_blocking(move || {
        let progress = |completed: usize, total: usize| {
            bar.set_length(total as u64);
            bar.set_position(completed as u64);
        };
        generate_report(&inputs, &run_config, &progress, Some(cancel))
    })
    .await??;

    pb.finish_and_clear();

    print_diagnostics(&run.diagnostics);
    print_failures(run.aggregation.failures());

    let batch = match &run.aggregation {
        Aggregation::Report(batch) => batch,
        Aggregation::Empty { submitted, .. } => {
            eprintln!(
                "{} no usable documents ({} submitted)",
                style("✗").red(),
                submitted
            );
            if config.batch.fail_on_empty {
                anyhow::bail!("no usable documents");
            }
            return Ok(());
        }
    };

    let rendered = ReportFormatter::new(config.report.clone()).render(&batch.report);
    let output = match args.format {
        OutputFormat::Text => format_report_text(&rendered),
        OutputFormat::Json => format_report_json(&rendered, batch)?,
        OutputFormat::Csv => format_report_csv(&rendered)?,
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Report written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    print_summary(&run, batch, start);

    if args.strict && (!run.diagnostics.is_empty() || !batch.failures.is_empty()) {
        anyhow::bail!(
            "{} input(s) skipped and {} document(s) failed",
            run.diagnostics.len(),
            batch.failures.len()
        );
    }

    Ok(())
}

/// Resolve glob patterns; plain paths are kept as given.
fn expand_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let matches: Vec<PathBuf> = glob(pattern)?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            anyhow::bail!("No matching files found for pattern: {}", pattern);
        }
        paths.extend(matches);
    }

    Ok(paths)
}

fn print_diagnostics(diagnostics: &[InputError]) {
    if diagnostics.is_empty() {
        return;
    }
    eprintln!("{}", style("Skipped inputs:").yellow());
    for diagnostic in diagnostics {
        eprintln!("  - {}", diagnostic);
    }
}

fn print_failures(failures: &[DocumentFailure]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("{}", style("Failed documents:").red());
    for failure in failures {
        eprintln!("  - {}: {}", failure.path.display(), failure.cause);
    }
}

fn print_summary(run: &RunReport, batch: &BatchReport, start: Instant) {
    eprintln!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        run.documents.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} included, {} failed, {} warnings",
        style(batch.succeeded).green(),
        style(batch.failures.len()).red(),
        style(batch.warnings.len()).yellow()
    );
    for warning in &batch.warnings {
        debug!("{}: {}", warning.path.display(), warning.warning);
    }
}

fn format_report_text(report: &RenderedReport) -> String {
    let mut output = String::new();

    output.push_str("NF-e Sales Report\n");
    output.push_str(&format!("Period: {}\n", report.period));
    output.push('\n');

    output.push_str("Issuer:\n");
    output.push_str(&format!("  {}\n", report.issuer.legal_name));
    output.push_str(&format!("  Trade name: {}\n", report.issuer.trade_name));
    output.push_str(&format!("  Tax id: {}\n", report.issuer.tax_id));
    output.push_str(&format!("  {}\n", report.issuer.address));
    output.push('\n');

    let description_width = report
        .items
        .iter()
        .map(|item| item.description.chars().count())
        .chain(std::iter::once("Description".len()))
        .max()
        .unwrap_or_default();
    let amount_width = report
        .items
        .iter()
        .map(|item| item.amount.chars().count())
        .chain([report.total.chars().count(), "Amount".len()])
        .max()
        .unwrap_or_default();

    output.push_str(&format!(
        "{:<dw$}  {:>aw$}  Date\n",
        "Description",
        "Amount",
        dw = description_width,
        aw = amount_width
    ));
    for item in &report.items {
        output.push_str(&format!(
            "{:<dw$}  {:>aw$}  {}\n",
            item.description,
            item.amount,
            item.date,
            dw = description_width,
            aw = amount_width
        ));
    }
    output.push('\n');
    output.push_str(&format!(
        "{:<dw$}  {:>aw$}",
        "Total",
        report.total,
        dw = description_width,
        aw = amount_width
    ));

    output
}

fn format_report_json(report: &RenderedReport, batch: &BatchReport) -> anyhow::Result<String> {
    let json = JsonReport {
        report,
        submitted: batch.submitted,
        succeeded: batch.succeeded,
        failures: &batch.failures,
        warnings: batch
            .warnings
            .iter()
            .map(|w| format!("{}: {}", w.path.display(), w.warning))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

fn format_report_csv(report: &RenderedReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["description", "amount", "date"])?;
    for item in &report.items {
        wtr.write_record([&item.description, &item.amount, &item.date])?;
    }
    wtr.write_record(["TOTAL", report.total.as_str(), ""])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
