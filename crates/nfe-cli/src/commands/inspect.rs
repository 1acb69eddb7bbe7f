//! Inspect command - extract a single NF-e document.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use nfe_core::document::rules::{format_currency, format_date, format_tax_id};
use nfe_core::models::config::ReportConfig;
use nfe_core::{DocumentExtractor, ExtractedDocument, ExtractionOutcome, NfeExtractor};

use super::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// NF-e XML document
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: InspectFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum InspectFormat {
    /// Plain text summary
    Text,
    /// JSON output
    Json,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    info!("Inspecting document: {}", args.input.display());

    let extractor = NfeExtractor::from_config(&config.extraction);
    let document = match extractor.extract(&args.input) {
        ExtractionOutcome::Success(document) => document,
        ExtractionOutcome::Failure(failure) => {
            anyhow::bail!("{}: {}", failure.path.display(), failure.cause);
        }
    };

    match args.format {
        InspectFormat::Text => println!("{}", format_document_text(&document, &config.report)),
        InspectFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
    }

    if !document.warnings.is_empty() {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &document.warnings {
            eprintln!("  - {}", warning);
        }
    }

    Ok(())
}

fn format_document_text(document: &ExtractedDocument, report: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", document.path.display()));
    let date = document
        .emission_date
        .map(|d| format_date(d, &report.date_format))
        .unwrap_or_else(|| report.not_available.clone());
    output.push_str(&format!("Emitted: {}\n", date));
    output.push('\n');

    output.push_str("Issuer:\n");
    match &document.issuer {
        Some(issuer) => {
            output.push_str(&format!("  {}\n", issuer.legal_name));
            output.push_str(&format!("  Trade name: {}\n", issuer.trade_name));
            output.push_str(&format!("  Tax id: {}\n", format_tax_id(&issuer.tax_id)));
            output.push_str(&format!("  {}\n", issuer.address.format()));
        }
        None => output.push_str(&format!("  {}\n", report.not_available)),
    }
    output.push('\n');

    output.push_str(&format!("Items ({}):\n", document.items.len()));
    for (n, item) in document.items.iter().enumerate() {
        output.push_str(&format!(
            "  {:>3}. {}  {}\n",
            n + 1,
            item.description,
            format_currency(item.amount, &report.currency_symbol, report.decimal_places)
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfe_core::{IssuerAddress, IssuerInfo, LineItem};

    #[test]
    fn test_text_without_issuer() {
        let document = ExtractedDocument {
            path: PathBuf::from("nota.xml"),
            issuer: None,
            emission_date: None,
            items: vec![LineItem {
                description: "Widget".to_string(),
                amount: "7.5".parse().unwrap(),
                emission_date: None,
            }],
            warnings: Vec::new(),
        };

        let text = format_document_text(&document, &ReportConfig::default());

        assert_eq!(
            text,
            "Document: nota.xml\nEmitted: N/D\n\nIssuer:\n  N/D\n\nItems (1):\n    1. Widget  R$ 7.50\n"
        );
    }

    #[test]
    fn test_text_with_issuer() {
        let document = ExtractedDocument {
            path: PathBuf::from("nota.xml"),
            issuer: Some(IssuerInfo {
                tax_id: "52998224725".to_string(),
                legal_name: "Maria Silva".to_string(),
                trade_name: "Doces da Maria".to_string(),
                address: IssuerAddress {
                    street: "Rua B".to_string(),
                    number: "7".to_string(),
                    neighborhood: "Jardim".to_string(),
                    municipality: "Natal".to_string(),
                    state: "RN".to_string(),
                },
            }),
            emission_date: "2024-01-05".parse().ok(),
            items: Vec::new(),
            warnings: Vec::new(),
        };

        let text = format_document_text(&document, &ReportConfig::default());

        assert!(text.contains("Emitted: 05/01/2024\n"));
        assert!(text.contains("  Tax id: 529.982.247-25\n"));
        assert!(text.contains("  Rua B, 7, Jardim, Natal - RN\n"));
        assert!(text.ends_with("Items (0):\n"));
    }
}
