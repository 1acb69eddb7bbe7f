//! Deterministic merge of per-document outcomes.

use crate::error::Result;
use crate::models::document::ExtractionOutcome;
use crate::models::report::{
    Aggregation, BatchReport, DocumentWarning, ReferencePeriod, ReportModel,
};

/// Merge outcomes given in submission order.
///
/// Issuer and reference period come from the earliest document that has
/// them; items are concatenated in submission order. The result depends
/// only on the order of `outcomes`, never on when each one completed.
///
/// Errors only when the summed total overflows.
pub fn merge_outcomes(outcomes: Vec<ExtractionOutcome>) -> Result<Aggregation> {
    let submitted = outcomes.len();

    let mut issuer = None;
    let mut period = None;
    let mut items = Vec::new();
    let mut failures = Vec::new();
    let mut warnings = Vec::new();
    let mut succeeded = 0;

    for outcome in outcomes {
        match outcome {
            ExtractionOutcome::Success(document) => {
                succeeded += 1;
                if issuer.is_none() {
                    issuer = document.issuer;
                }
                if period.is_none() {
                    period = document.emission_date.map(ReferencePeriod::from_date);
                }
                items.extend(document.items);
                warnings.extend(document.warnings.into_iter().map(|warning| DocumentWarning {
                    path: document.path.clone(),
                    warning,
                }));
            }
            ExtractionOutcome::Failure(failure) => failures.push(failure),
        }
    }

    if succeeded == 0 {
        return Ok(Aggregation::Empty {
            submitted,
            failures,
        });
    }

    Ok(Aggregation::Report(BatchReport {
        report: ReportModel::new(issuer, period, items)?,
        submitted,
        succeeded,
        failures,
        warnings,
    }))
}
