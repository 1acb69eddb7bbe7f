//! NF-e document extraction module.

mod parser;
pub mod rules;

pub use parser::NfeExtractor;

use std::path::Path;

use crate::models::document::ExtractionOutcome;

/// Trait for per-document extractors.
///
/// Implementations must not share mutable state between calls: the
/// coordinator runs `extract` on many threads at once.
pub trait DocumentExtractor: Sync {
    /// Extract one document. Failures are returned as values, never raised.
    fn extract(&self, path: &Path) -> ExtractionOutcome;
}

impl<E: DocumentExtractor + ?Sized> DocumentExtractor for &E {
    fn extract(&self, path: &Path) -> ExtractionOutcome {
        (**self).extract(path)
    }
}
