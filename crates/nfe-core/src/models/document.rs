//! Per-document extraction records for NF-e files.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::{DocumentError, ExtractionWarning};

/// Identity of the entity that issued a fiscal document.
///
/// Always complete: a document whose issuer block lacks any field yields no
/// `IssuerInfo` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuerInfo {
    /// CNPJ, or CPF for individual issuers.
    pub tax_id: String,

    /// Registered legal name (razão social).
    pub legal_name: String,

    /// Trade name (nome fantasia).
    pub trade_name: String,

    /// Issuer address.
    pub address: IssuerAddress,
}

/// Address block of the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuerAddress {
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub municipality: String,
    /// Two-letter state code (UF).
    pub state: String,
}

impl IssuerAddress {
    /// Format the address as a single line: `street, number, neighborhood, municipality - UF`.
    pub fn format(&self) -> String {
        format!(
            "{}, {}, {}, {} - {}",
            self.street, self.number, self.neighborhood, self.municipality, self.state
        )
    }
}

/// A single product or service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: String,

    /// Line amount, kept exact.
    pub amount: Decimal,

    /// Emission date of the source document, when it could be parsed.
    pub emission_date: Option<NaiveDate>,
}

/// Everything extracted from one well-formed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDocument {
    /// Source path.
    pub path: PathBuf,

    /// Issuer, if the document carried a complete issuer block.
    pub issuer: Option<IssuerInfo>,

    /// Emission date, if available.
    pub emission_date: Option<NaiveDate>,

    /// Line items in document order.
    pub items: Vec<LineItem>,

    /// Recoverable issues found while extracting.
    #[serde(serialize_with = "serialize_display_list")]
    pub warnings: Vec<ExtractionWarning>,
}

/// A document that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    #[serde(serialize_with = "serialize_display")]
    pub cause: DocumentError,
}

impl DocumentFailure {
    pub fn new(path: impl Into<PathBuf>, cause: DocumentError) -> Self {
        Self {
            path: path.into(),
            cause,
        }
    }
}

/// Result of extracting one document: a record or a failure, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Success(ExtractedDocument),
    Failure(DocumentFailure),
}

impl ExtractionOutcome {
    /// Path of the document this outcome belongs to.
    pub fn path(&self) -> &Path {
        match self {
            ExtractionOutcome::Success(doc) => &doc.path,
            ExtractionOutcome::Failure(failure) => &failure.path,
        }
    }
}

fn serialize_display<T: std::fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_display_list<T: std::fmt::Display, S: Serializer>(
    values: &[T],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|v| v.to_string()))
}
