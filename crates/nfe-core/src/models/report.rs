//! Aggregated report model and the renderer-facing view of it.

use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::document::{DocumentFailure, IssuerInfo, LineItem};
use crate::error::{ExtractionWarning, ReportError, Result};

/// Month and year a report represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferencePeriod {
    pub month: u32,
    pub year: i32,
}

impl ReferencePeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }
}

impl fmt::Display for ReferencePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

/// Accumulated result of a run.
///
/// `total` is always the exact sum of `items`; the fields are read-only so
/// the two cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportModel {
    issuer: Option<IssuerInfo>,
    period: Option<ReferencePeriod>,
    items: Vec<LineItem>,
    total: Decimal,
}

impl ReportModel {
    /// Build a report, computing the total from `items`.
    ///
    /// Fails with [`ReportError::TotalOverflow`] instead of panicking when
    /// the sum leaves the `Decimal` range.
    pub fn new(
        issuer: Option<IssuerInfo>,
        period: Option<ReferencePeriod>,
        items: Vec<LineItem>,
    ) -> Result<Self> {
        let total = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount))
            .ok_or(ReportError::TotalOverflow { items: items.len() })?;
        Ok(Self {
            issuer,
            period,
            items,
            total,
        })
    }

    pub fn issuer(&self) -> Option<&IssuerInfo> {
        self.issuer.as_ref()
    }

    pub fn period(&self) -> Option<ReferencePeriod> {
        self.period
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Exact, unrounded total.
    pub fn total(&self) -> Decimal {
        self.total
    }
}

/// A recoverable warning tied to the document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWarning {
    pub path: PathBuf,
    pub warning: ExtractionWarning,
}

/// A finished report together with everything that went wrong along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// The merged report.
    pub report: ReportModel,

    /// Number of documents submitted to the coordinator.
    pub submitted: usize,

    /// Number of documents that contributed to the report.
    pub succeeded: usize,

    /// Failed documents, in submission order.
    pub failures: Vec<DocumentFailure>,

    /// Warnings from successful documents, in submission order.
    pub warnings: Vec<DocumentWarning>,
}

/// What a coordinator run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// At least one document was extracted.
    Report(BatchReport),

    /// No document produced a usable outcome. `submitted == 0` means no
    /// documents were given at all.
    Empty {
        submitted: usize,
        failures: Vec<DocumentFailure>,
    },
}

impl Aggregation {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            Aggregation::Report(batch) => Some(batch),
            Aggregation::Empty { .. } => None,
        }
    }

    pub fn failures(&self) -> &[DocumentFailure] {
        match self {
            Aggregation::Report(batch) => &batch.failures,
            Aggregation::Empty { failures, .. } => failures,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Aggregation::Empty { .. })
    }
}

/// Issuer fields as display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedIssuer {
    pub tax_id: String,
    pub legal_name: String,
    pub trade_name: String,
    pub address: String,
}

/// One report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedItem {
    pub description: String,
    pub amount: String,
    pub date: String,
}

/// Report shape handed to renderers: every field present, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    pub issuer: RenderedIssuer,
    pub period: String,
    pub items: Vec<RenderedItem>,
    pub total: String,
}
