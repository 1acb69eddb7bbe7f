//! NF-e XML parser built on quick-xml's namespace-aware reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::{DocumentError, ExtractionWarning};
use crate::models::config::ExtractionConfig;
use crate::models::document::*;

use super::DocumentExtractor;
use super::rules::{parse_amount, parse_emission_date, parse_emission_timestamp, validate_tax_id};

/// Element names of the sections the parser cares about.
const ISSUER_SECTION: &str = "emit";
const EMISSION_SECTION: &str = "ide";
const ITEM_SECTION: &str = "det";
const PRODUCT_SECTION: &str = "prod";

/// Extractor for NF-e XML documents.
#[derive(Debug, Clone)]
pub struct NfeExtractor {
    /// Namespace the relevant elements must be bound to.
    namespace: String,
    /// Timestamp format without the offset.
    timestamp_format: String,
    /// Fixed UTC offset suffix.
    utc_offset: String,
    /// Format of the date-only fallback field.
    date_fallback_format: String,
    /// Whether to check issuer tax id check digits.
    validate_tax_id: bool,
}

impl NfeExtractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create an extractor from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            timestamp_format: config.timestamp_format.clone(),
            utc_offset: config.utc_offset.clone(),
            date_fallback_format: config.date_fallback_format.clone(),
            validate_tax_id: config.validate_tax_id,
        }
    }

    /// Set the namespace elements must be bound to.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the timestamp format and its fixed UTC offset suffix.
    pub fn with_timestamp_format(
        mut self,
        format: impl Into<String>,
        utc_offset: impl Into<String>,
    ) -> Self {
        self.timestamp_format = format.into();
        self.utc_offset = utc_offset.into();
        self
    }

    /// Set tax id validation.
    pub fn with_tax_id_validation(mut self, validate: bool) -> Self {
        self.validate_tax_id = validate;
        self
    }

    /// Extract a document held in memory. `path` only labels the outcome.
    pub fn extract_from_str(&self, path: &Path, xml: &str) -> ExtractionOutcome {
        self.extract_from_reader(path, xml.as_bytes())
    }

    /// Extract a document from any buffered reader.
    pub fn extract_from_reader<R: BufRead>(&self, path: &Path, reader: R) -> ExtractionOutcome {
        match self.parse(reader) {
            Ok(raw) => {
                let document = self.build(path, raw);
                debug!(
                    path = %path.display(),
                    items = document.items.len(),
                    issuer = document.issuer.is_some(),
                    "Extracted document"
                );
                ExtractionOutcome::Success(document)
            }
            Err(cause) => {
                debug!(path = %path.display(), error = %cause, "Document extraction failed");
                ExtractionOutcome::Failure(DocumentFailure::new(path, cause))
            }
        }
    }

    fn parse<R: BufRead>(&self, reader: R) -> Result<RawDocument, DocumentError> {
        let mut reader = NsReader::from_reader(reader);
        let namespace = self.namespace.as_bytes();

        let mut state = ParseState::default();
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position();
            let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok(pair) => pair,
                Err(e) => {
                    return Err(DocumentError::Malformed(format!(
                        "{} (near byte {})",
                        e, position
                    )));
                }
            };
            let in_ns = matches!(resolved, ResolveResult::Bound(Namespace(ns)) if ns == namespace);

            match event {
                Event::Start(e) => {
                    state.open(element_name(e.local_name().as_ref()), in_ns);
                }
                Event::Empty(e) => {
                    state.open(element_name(e.local_name().as_ref()), in_ns);
                    state.close()?;
                }
                Event::End(_) => {
                    state.close()?;
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| DocumentError::Malformed(e.to_string()))?;
                    state.text.push_str(&text);
                }
                Event::CData(c) => {
                    state.text.push_str(&String::from_utf8_lossy(&c));
                }
                Event::Eof => break,
                _ => {}
            }

            buf.clear();
        }

        state.finish()
    }

    fn build(&self, path: &Path, raw: RawDocument) -> ExtractedDocument {
        let mut warnings = Vec::new();
        let emission_date = self.emission_date(&raw, &mut warnings);

        let issuer = match raw.issuer.complete() {
            Ok(issuer) => {
                if self.validate_tax_id && !validate_tax_id(&issuer.tax_id) {
                    warnings.push(ExtractionWarning::InvalidTaxId(issuer.tax_id.clone()));
                }
                Some(issuer)
            }
            Err(missing) => {
                warnings.push(ExtractionWarning::IncompleteIssuer { missing });
                None
            }
        };

        for warning in &warnings {
            trace!(path = %path.display(), %warning, "Extraction warning");
        }

        let items = raw
            .items
            .into_iter()
            .map(|(description, amount)| LineItem {
                description,
                amount,
                emission_date,
            })
            .collect();

        ExtractedDocument {
            path: path.to_path_buf(),
            issuer,
            emission_date,
            items,
            warnings,
        }
    }

    fn emission_date(
        &self,
        raw: &RawDocument,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Option<NaiveDate> {
        let parsed = if let Some(value) = &raw.timestamp {
            parse_emission_timestamp(value, &self.timestamp_format, &self.utc_offset)
                .map_err(|reason| (value, reason))
        } else if let Some(value) = &raw.date {
            parse_emission_date(value, &self.date_fallback_format).map_err(|reason| (value, reason))
        } else {
            warnings.push(ExtractionWarning::MissingTimestamp);
            return None;
        };

        match parsed {
            Ok(date) => Some(date),
            Err((value, reason)) => {
                warnings.push(ExtractionWarning::Timestamp {
                    value: value.clone(),
                    reason,
                });
                None
            }
        }
    }
}

impl Default for NfeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for NfeExtractor {
    fn extract(&self, path: &Path) -> ExtractionOutcome {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot open document");
                return ExtractionOutcome::Failure(DocumentFailure::new(
                    path,
                    DocumentError::Read(e.to_string()),
                ));
            }
        };
        self.extract_from_reader(path, BufReader::new(file))
    }
}

fn element_name(local: &[u8]) -> String {
    String::from_utf8_lossy(local).into_owned()
}

/// Issuer fields collected before completeness is known.
#[derive(Debug, Default)]
struct IssuerFields {
    tax_id: Option<String>,
    legal_name: Option<String>,
    trade_name: Option<String>,
    street: Option<String>,
    number: Option<String>,
    neighborhood: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
}

impl IssuerFields {
    fn set(&mut self, element: &str, value: &str) {
        let slot = match element {
            "CNPJ" | "CPF" => &mut self.tax_id,
            "xNome" => &mut self.legal_name,
            "xFant" => &mut self.trade_name,
            "xLgr" => &mut self.street,
            "nro" => &mut self.number,
            "xBairro" => &mut self.neighborhood,
            "xMun" => &mut self.municipality,
            "UF" => &mut self.state,
            _ => return,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    /// All-or-nothing conversion; on failure lists the missing elements.
    fn complete(self) -> Result<IssuerInfo, Vec<&'static str>> {
        let mut missing = Vec::new();
        let mut require = |value: Option<String>, name: &'static str| {
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let tax_id = require(self.tax_id, "CNPJ");
        let legal_name = require(self.legal_name, "xNome");
        let trade_name = require(self.trade_name, "xFant");
        let street = require(self.street, "xLgr");
        let number = require(self.number, "nro");
        let neighborhood = require(self.neighborhood, "xBairro");
        let municipality = require(self.municipality, "xMun");
        let state = require(self.state, "UF");

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(IssuerInfo {
            tax_id,
            legal_name,
            trade_name,
            address: IssuerAddress {
                street,
                number,
                neighborhood,
                municipality,
                state,
            },
        })
    }
}

/// Description and amount text of the `det` entry being read.
#[derive(Debug, Default)]
struct ItemFields {
    description: Option<String>,
    amount: Option<String>,
}

/// Values pulled out of one document.
#[derive(Debug, Default)]
struct RawDocument {
    issuer: IssuerFields,
    timestamp: Option<String>,
    date: Option<String>,
    items: Vec<(String, Decimal)>,
}

#[derive(Debug)]
struct Frame {
    name: String,
    in_ns: bool,
}

#[derive(Debug, Default)]
struct ParseState {
    stack: Vec<Frame>,
    text: String,
    raw: RawDocument,
    seen_root: bool,
    issuer_closed: bool,
    item: Option<ItemFields>,
    item_count: usize,
}

impl ParseState {
    fn within(&self, section: &str) -> bool {
        self.stack.iter().any(|f| f.in_ns && f.name == section)
    }

    fn open(&mut self, name: String, in_ns: bool) {
        self.seen_root = true;
        self.text.clear();
        if in_ns && name == ITEM_SECTION {
            self.item_count += 1;
            self.item = Some(ItemFields::default());
        }
        self.stack.push(Frame { name, in_ns });
    }

    fn close(&mut self) -> Result<(), DocumentError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| DocumentError::Malformed("unexpected closing tag".to_string()))?;
        let text = std::mem::take(&mut self.text);
        if !frame.in_ns {
            return Ok(());
        }
        let value = text.trim();

        match frame.name.as_str() {
            ITEM_SECTION => return self.finish_item(),
            ISSUER_SECTION => {
                self.issuer_closed = true;
                return Ok(());
            }
            _ => {}
        }

        if self.within(ISSUER_SECTION) && !self.issuer_closed {
            self.raw.issuer.set(&frame.name, value);
        } else if self.within(EMISSION_SECTION) {
            match frame.name.as_str() {
                "dhEmi" if self.raw.timestamp.is_none() => {
                    self.raw.timestamp = Some(value.to_string());
                }
                "dEmi" if self.raw.date.is_none() => {
                    self.raw.date = Some(value.to_string());
                }
                _ => {}
            }
        } else if self.within(PRODUCT_SECTION) {
            if let Some(item) = self.item.as_mut() {
                match frame.name.as_str() {
                    "xProd" if item.description.is_none() => {
                        item.description = Some(value.to_string());
                    }
                    "vProd" if item.amount.is_none() => {
                        item.amount = Some(value.to_string());
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn finish_item(&mut self) -> Result<(), DocumentError> {
        let index = self.item_count;
        let fields = self.item.take().unwrap_or_default();

        let description = fields
            .description
            .filter(|d| !d.is_empty())
            .ok_or(DocumentError::MissingField {
                item: index,
                field: "xProd",
            })?;
        let amount_text = fields
            .amount
            .filter(|a| !a.is_empty())
            .ok_or(DocumentError::MissingField {
                item: index,
                field: "vProd",
            })?;
        let amount = parse_amount(&amount_text).ok_or(DocumentError::InvalidAmount {
            item: index,
            value: amount_text.clone(),
        })?;

        self.raw.items.push((description, amount));
        Ok(())
    }

    fn finish(self) -> Result<RawDocument, DocumentError> {
        if let Some(open) = self.stack.last() {
            return Err(DocumentError::Malformed(format!(
                "unexpected end of document inside <{}>",
                open.name
            )));
        }
        if !self.seen_root {
            return Err(DocumentError::Malformed(
                "document has no root element".to_string(),
            ));
        }
        Ok(self.raw)
    }
}
