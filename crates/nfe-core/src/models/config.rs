//! Configuration structures for the report pipeline.

use serde::{Deserialize, Serialize};

use crate::document::rules::dates::is_valid_format;
use crate::error::ReportError;

/// Default NF-e XML namespace.
pub const NFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";

/// Main configuration for the nfe pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NfeConfig {
    /// Document extraction configuration.
    pub extraction: ExtractionConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,

    /// Report presentation configuration.
    pub report: ReportConfig,
}

/// Document extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Namespace the issuer, emission and line-item elements must be bound to.
    pub namespace: String,

    /// chrono format of the emission timestamp, without the UTC offset.
    pub timestamp_format: String,

    /// Fixed UTC offset suffix following the timestamp (e.g. `-03:00`).
    pub utc_offset: String,

    /// Format of the date-only emission field used by older layouts.
    pub date_fallback_format: String,

    /// Check CNPJ/CPF check digits of the issuer.
    pub validate_tax_id: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            namespace: NFE_NAMESPACE.to_string(),
            timestamp_format: "%Y-%m-%dT%H:%M:%S".to_string(),
            utc_offset: "-03:00".to_string(),
            date_fallback_format: "%Y-%m-%d".to_string(),
            validate_tax_id: false,
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker threads (0 = available parallelism).
    pub workers: usize,

    /// Treat a run without any usable document as an error.
    pub fail_on_empty: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            fail_on_empty: true,
        }
    }
}

/// Report presentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Currency symbol prefixed to amounts.
    pub currency_symbol: String,

    /// Decimal places shown for amounts (rounded half-up).
    pub decimal_places: u32,

    /// chrono format for item dates.
    pub date_format: String,

    /// Marker for missing issuer fields and item dates.
    pub not_available: String,

    /// Marker for an unknown reference period.
    pub unknown_period: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "R$".to_string(),
            decimal_places: 2,
            date_format: "%d/%m/%Y".to_string(),
            not_available: "N/D".to_string(),
            unknown_period: "unknown".to_string(),
        }
    }
}

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_PLACES: u32 = 28;

impl NfeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.extraction.namespace.trim().is_empty() {
            return Err(ReportError::Config(
                "extraction.namespace must not be empty".to_string(),
            ));
        }
        if self.extraction.timestamp_format.trim().is_empty() {
            return Err(ReportError::Config(
                "extraction.timestamp_format must not be empty".to_string(),
            ));
        }
        for (key, format) in [
            ("extraction.timestamp_format", &self.extraction.timestamp_format),
            ("extraction.date_fallback_format", &self.extraction.date_fallback_format),
            ("report.date_format", &self.report.date_format),
        ] {
            if !is_valid_format(format) {
                return Err(ReportError::Config(format!(
                    "{} is not a valid date format: {:?}",
                    key, format
                )));
            }
        }
        if self.report.decimal_places > MAX_DECIMAL_PLACES {
            return Err(ReportError::Config(format!(
                "report.decimal_places must be at most {}",
                MAX_DECIMAL_PLACES
            )));
        }
        Ok(())
    }
}
