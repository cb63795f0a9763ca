//! Batch processing command for multiple recognized invoices.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use seikyu_core::{InvoiceDataAssembler, InvoiceExtractionResult};

use super::config::load_config;
use super::process::{extract_file, format_result, source_name_for, status_label, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for recognized-text files (e.g. "inbox/*.txt")
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers (default: batch.jobs from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    result: Option<InvoiceExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let jobs = args.jobs.unwrap_or(config.batch.jobs).max(1);
    let continue_on_error = args.continue_on_error || config.batch.continue_on_error;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let assembler = Arc::new(InvoiceDataAssembler::new(config.extraction));
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let assembler = Arc::clone(&assembler);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let outcome = tokio::task::spawn_blocking(move || {
                let file_start = Instant::now();
                let result = extract_file(&assembler, &path, &source_name_for(&path), None);
                (path, result, file_start.elapsed().as_millis() as u64)
            })
            .await?;
            anyhow::Ok((index, outcome))
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, (path, outcome, processing_time_ms)) = joined??;
        progress.inc(1);

        match outcome {
            Ok(result) => results.push((
                index,
                ProcessResult {
                    path,
                    result: Some(result),
                    error: None,
                    processing_time_ms,
                },
            )),
            Err(e) => {
                let error_msg = e.to_string();
                if continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push((
                        index,
                        ProcessResult {
                            path,
                            result: None,
                            error: Some(error_msg),
                            processing_time_ms,
                        },
                    ));
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    tasks.abort_all();
                    progress.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }
    }

    progress.finish_and_clear();

    results.sort_by_key(|(index, _)| *index);
    let results: Vec<ProcessResult> = results.into_iter().map(|(_, r)| r).collect();

    if let Some(output_dir) = &args.output_dir {
        for item in &results {
            if let Some(result) = &item.result {
                let output_path = output_path_for(output_dir, &item.path, args.format);
                fs::write(&output_path, format_result(result, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<&ProcessResult> = results.iter().filter(|r| r.error.is_some()).collect();
    let successful = results.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for item in &failed {
            println!(
                "  - {}: {}",
                item.path.display(),
                item.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// `inbox/a.pdf.txt` → `<dir>/a.pdf.json`.
fn output_path_for(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{}.{}", source_name_for(input), format.extension()))
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "issue_date",
        "issuer_name",
        "total_amount",
        "currency",
        "confidence",
        "review_status",
        "processing_time_ms",
        "error",
    ])?;

    for item in results {
        let filename = item
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(result) = &item.result {
            wtr.write_record([
                filename,
                "success",
                result.basic_info.invoice_number.as_deref().unwrap_or(""),
                &result
                    .basic_info
                    .issue_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                result.issuer.as_ref().map(|i| i.name.as_str()).unwrap_or(""),
                &result.amounts.total_amount.to_string(),
                &result.basic_info.currency,
                &format!("{:.2}", result.metadata.ocr_confidence),
                status_label(result.metadata.status),
                &item.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &item.processing_time_ms.to_string(),
                item.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
