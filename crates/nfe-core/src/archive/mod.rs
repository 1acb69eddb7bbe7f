//! Input classification and archive expansion.

mod expander;

pub use expander::{Expansion, expand_inputs};

use std::path::Path;

/// Suffix of document inputs.
pub const DOCUMENT_EXTENSION: &str = "xml";

/// Suffix of archive inputs.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Kind of an input path, decided by its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A single NF-e XML document.
    Document,
    /// A zip archive that may hold documents.
    Archive,
    /// Anything else (including `.rar`).
    Unsupported,
}

impl InputKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn classify(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            DOCUMENT_EXTENSION => InputKind::Document,
            ARCHIVE_EXTENSION => InputKind::Archive,
            _ => InputKind::Unsupported,
        }
    }
}

/// Whether an archive member name denotes a document.
pub fn is_document_name(name: &str) -> bool {
    InputKind::classify(Path::new(name)) == InputKind::Document
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(InputKind::classify(Path::new("nota.xml")), InputKind::Document);
        assert_eq!(InputKind::classify(Path::new("NOTA.XML")), InputKind::Document);
        assert_eq!(InputKind::classify(Path::new("lote.zip")), InputKind::Archive);
        assert_eq!(InputKind::classify(Path::new("lote.Zip")), InputKind::Archive);
        assert_eq!(InputKind::classify(Path::new("lote.rar")), InputKind::Unsupported);
        assert_eq!(InputKind::classify(Path::new("README")), InputKind::Unsupported);
    }

    #[test]
    fn test_document_member_names() {
        assert!(is_document_name("2024/03/nota.xml"));
        assert!(is_document_name("nota.Xml"));
        assert!(!is_document_name("leiame.txt"));
        assert!(!is_document_name("notas/"));
    }
}
