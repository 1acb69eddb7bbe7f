//! Core library for NF-e (Brazilian electronic invoice) batch reports.
//!
//! This crate provides:
//! - Input expansion (loose `.xml` documents and `.zip` archives)
//! - Streaming extraction of issuer, emission date and line items
//! - Parallel, order-stable aggregation into a single report
//! - Presentation formatting (currency, dates, tax ids)

pub mod archive;
pub mod batch;
pub mod document;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod render;

pub use archive::{Expansion, InputKind, expand_inputs};
pub use batch::{CancellationToken, Coordinator, NoProgress, ProgressSink};
pub use document::{DocumentExtractor, NfeExtractor};
pub use error::{DocumentError, ExtractionWarning, InputError, ReportError, Result};
pub use models::config::NfeConfig;
pub use models::document::{
    DocumentFailure, ExtractedDocument, ExtractionOutcome, IssuerAddress, IssuerInfo, LineItem,
};
pub use models::report::{
    Aggregation, BatchReport, DocumentWarning, ReferencePeriod, RenderedReport, ReportModel,
};
pub use pipeline::{RunReport, generate_report};
pub use render::ReportFormatter;
