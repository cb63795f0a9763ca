//! Process command - extract data from a single recognized invoice.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use seikyu_core::{
    InvoiceDataAssembler, InvoiceExtractionResult, InvoiceStatus, SidecarTextRecognizer,
};

use super::config::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Recognized text of the invoice (e.g. invoice.pdf.txt)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Name of the original uploaded file (default: input name without .txt)
    #[arg(long)]
    source_name: Option<String>,

    /// Content hash of the original file (default: SHA-256 of the input)
    #[arg(long)]
    file_hash: Option<String>,

    /// Show completeness and per-field confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let assembler = InvoiceDataAssembler::new(config.extraction);
    let source_name = args
        .source_name
        .clone()
        .unwrap_or_else(|| source_name_for(&args.input));
    let result = extract_file(&assembler, &args.input, &source_name, args.file_hash.as_deref())?;

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        print_confidence(&result);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read one recognized-text file and assemble its record.
pub fn extract_file(
    assembler: &InvoiceDataAssembler,
    path: &Path,
    source_name: &str,
    file_hash: Option<&str>,
) -> anyhow::Result<InvoiceExtractionResult> {
    let bytes = fs::read(path)?;
    let file_hash = match file_hash {
        Some(hash) => hash.to_string(),
        None => hex::encode(Sha256::digest(&bytes)),
    };

    let result =
        assembler.assemble_document(&SidecarTextRecognizer::new(), &bytes, source_name, &file_hash)?;
    Ok(result)
}

/// The original upload name: `invoice.pdf.txt` came from `invoice.pdf`.
pub fn source_name_for(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("invoice");

    match name.strip_suffix(".txt") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => name.to_string(),
    }
}

fn print_confidence(result: &InvoiceExtractionResult) {
    let metadata = &result.metadata;

    println!();
    println!(
        "{} Completeness: {:.0}%",
        style("ℹ").blue(),
        metadata.ocr_confidence * 100.0
    );
    if metadata.status == InvoiceStatus::NeedsReview {
        println!("{} Marked for review", style("!").yellow());
    }
    for (field, confidence) in &metadata.field_confidence {
        println!("   {:<40} {:.2}", field, confidence);
    }
    for warning in &metadata.warnings {
        println!("{} {}", style("!").yellow(), warning);
    }
}

pub fn format_result(
    result: &InvoiceExtractionResult,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

const CSV_HEADER: [&str; 13] = [
    "invoice_number",
    "issue_date",
    "due_date",
    "billing_to",
    "issuer_name",
    "registration_number",
    "subtotal",
    "tax_amount",
    "total_amount",
    "currency",
    "line_items",
    "confidence",
    "status",
];

fn format_csv(result: &InvoiceExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    wtr.write_record(csv_row(result))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn csv_row(result: &InvoiceExtractionResult) -> [String; 13] {
    let basic = &result.basic_info;
    let issuer = result.issuer.as_ref();

    [
        basic.invoice_number.clone().unwrap_or_default(),
        basic.issue_date.map(|d| d.to_string()).unwrap_or_default(),
        result
            .payment_terms
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_default(),
        result.billing_to.company_name.clone(),
        issuer.map(|i| i.name.clone()).unwrap_or_default(),
        issuer
            .and_then(|i| i.registration_number.clone())
            .unwrap_or_default(),
        result.amounts.subtotal.to_string(),
        result.amounts.tax_amount.to_string(),
        result.amounts.total_amount.to_string(),
        basic.currency.clone(),
        result.line_items.len().to_string(),
        format!("{:.2}", result.metadata.ocr_confidence),
        status_label(result.metadata.status).to_string(),
    ]
}

pub fn status_label(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "draft",
        InvoiceStatus::NeedsReview => "needs_review",
    }
}

fn format_text(result: &InvoiceExtractionResult) -> String {
    let basic = &result.basic_info;
    let currency = &basic.currency;
    let mut output = String::new();

    output.push_str(&format!(
        "Invoice: {}\n",
        basic.invoice_number.as_deref().unwrap_or("-")
    ));
    if let Some(date) = basic.issue_date {
        output.push_str(&format!("Date: {}\n", date));
    }
    if let Some(subject) = &basic.subject {
        output.push_str(&format!("Subject: {}\n", subject));
    }
    output.push('\n');

    output.push_str("Billing to:\n");
    output.push_str(&format!("  {}\n", result.billing_to.company_name));
    for value in [&result.billing_to.department, &result.billing_to.contact_person]
        .into_iter()
        .flatten()
    {
        output.push_str(&format!("  {}\n", value));
    }
    output.push('\n');

    if let Some(issuer) = &result.issuer {
        output.push_str("Issuer:\n");
        output.push_str(&format!("  {}\n", issuer.name));
        if let Some(number) = &issuer.registration_number {
            output.push_str(&format!("  Registration: {}\n", number));
        }
        for value in [&issuer.address, &issuer.phone, &issuer.email]
            .into_iter()
            .flatten()
        {
            output.push_str(&format!("  {}\n", value));
        }
        output.push('\n');
    }

    if !result.line_items.is_empty() {
        output.push_str("Items:\n");
        for item in &result.line_items {
            output.push_str(&format!("  {}  {} {}\n", item.description, item.amount, currency));
        }
        output.push('\n');
    }

    let amounts = &result.amounts;
    output.push_str("Summary:\n");
    output.push_str(&format!("  Subtotal: {} {}\n", amounts.subtotal, currency));
    output.push_str(&format!("  Tax:      {} {}\n", amounts.tax_amount, currency));
    output.push_str(&format!("  Total:    {} {}\n", amounts.total_amount, currency));

    if let Some(due_date) = result.payment_terms.due_date {
        output.push_str(&format!("\nPayment due: {}\n", due_date));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_name_strips_txt() {
        assert_eq!(source_name_for(Path::new("/tmp/invoice.pdf.txt")), "invoice.pdf");
        assert_eq!(source_name_for(Path::new("scan.png")), "scan.png");
        assert_eq!(source_name_for(Path::new(".txt")), ".txt");
    }

    #[test]
    fn test_csv_has_header_and_row() {
        let assembler = InvoiceDataAssembler::new(Default::default());
        let result = seikyu_core::InvoiceExtractor::extract_from_text(
            &assembler,
            "請求書番号: INV-2024-001\n合計金額 ¥110,000\n",
        );

        let csv = format_result(&result, OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("invoice_number,issue_date"));
        assert!(lines[1].starts_with("INV-2024-001,"));
        assert!(lines[1].contains("110000"));
    }
}
