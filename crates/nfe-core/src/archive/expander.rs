//! Flattening of mixed document/archive inputs into document paths.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};
use zip::ZipArchive;

use super::{InputKind, is_document_name};
use crate::error::{InputError, ReportError, Result};

/// Result of expanding a list of inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Document paths in input order, archive members in archive order.
    pub documents: Vec<PathBuf>,

    /// Inputs (or archive members) that were dropped, with the reason.
    pub diagnostics: Vec<InputError>,
}

/// Expand `inputs` into the flat list of documents to extract.
///
/// Document inputs pass through unchanged. Every `.xml` member of a `.zip`
/// input is **written to disk** under the archive's own directory (member
/// paths preserved) and the written path is returned in its place.
///
/// Every document path appears at most once. A repeated document input is
/// dropped, and an archive member whose destination is already claimed by
/// this run (a document input or an earlier member) is not written.
///
/// Unsupported inputs, duplicates and unreadable archives are recorded in
/// [`Expansion::diagnostics`] and skipped. Only a failure to write an
/// extracted member aborts the whole expansion.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Expansion> {
    let mut expansion = Expansion::default();
    let mut claims = Claims::new(
        inputs
            .iter()
            .map(|input| input.as_ref())
            .filter(|path| InputKind::classify(path) == InputKind::Document),
    );

    for input in inputs {
        let path = input.as_ref();
        match InputKind::classify(path) {
            InputKind::Document => {
                if claims.claim(path) {
                    expansion.documents.push(path.to_path_buf());
                } else {
                    warn!(path = %path.display(), "Skipping duplicate input");
                    expansion.diagnostics.push(InputError::DuplicateInput {
                        path: path.to_path_buf(),
                    });
                }
            }
            InputKind::Archive => {
                let members = expand_archive(path, &mut claims, &mut expansion.diagnostics)?;
                expansion.documents.extend(members);
            }
            InputKind::Unsupported => {
                warn!(path = %path.display(), "Skipping unsupported input");
                expansion.diagnostics.push(InputError::Unsupported {
                    path: path.to_path_buf(),
                });
            }
        }
    }

    info!(
        inputs = inputs.len(),
        documents = expansion.documents.len(),
        skipped = expansion.diagnostics.len(),
        "Expanded inputs"
    );

    Ok(expansion)
}

/// Document paths taken by the current run, compared in absolute form.
struct Claims {
    /// Document inputs; archive members may never land on one of these.
    inputs: HashSet<PathBuf>,
    taken: HashSet<PathBuf>,
}

impl Claims {
    fn new<'a>(inputs: impl Iterator<Item = &'a Path>) -> Self {
        Self {
            inputs: inputs.map(claim_key).collect(),
            taken: HashSet::new(),
        }
    }

    /// Claim a document input. False if it was already claimed.
    fn claim(&mut self, path: &Path) -> bool {
        self.taken.insert(claim_key(path))
    }

    /// Whether an archive member may be written to `destination`.
    fn is_free(&self, destination: &Path) -> bool {
        let key = claim_key(destination);
        !self.inputs.contains(&key) && !self.taken.contains(&key)
    }
}

fn claim_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Extract the document members of one archive.
///
/// A corrupt archive contributes nothing: members already written before
/// the failure stay on disk but are neither returned nor claimed.
fn expand_archive(
    path: &Path,
    claims: &mut Claims,
    diagnostics: &mut Vec<InputError>,
) -> Result<Vec<PathBuf>> {
    let open_failure = |reason: String| {
        warn!(path = %path.display(), %reason, "Cannot open archive");
        InputError::ArchiveOpen {
            path: path.to_path_buf(),
            reason,
        }
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            diagnostics.push(open_failure(e.to_string()));
            return Ok(Vec::new());
        }
    };
    let mut archive = match ZipArchive::new(BufReader::new(file)) {
        Ok(archive) => archive,
        Err(e) => {
            diagnostics.push(open_failure(e.to_string()));
            return Ok(Vec::new());
        }
    };

    let target_dir = extraction_dir(path);
    let mut extracted = Vec::new();
    let mut skipped = Vec::new();

    for index in 0..archive.len() {
        let mut member = match archive.by_index(index) {
            Ok(member) => member,
            Err(e) => {
                diagnostics.push(open_failure(format!("member {}: {}", index, e)));
                return Ok(Vec::new());
            }
        };

        if member.is_dir() || !is_document_name(member.name()) {
            trace!(archive = %path.display(), member = member.name(), "Ignoring member");
            continue;
        }

        let Some(relative) = member.enclosed_name() else {
            warn!(archive = %path.display(), member = member.name(), "Skipping unsafe member");
            skipped.push(InputError::UnsafeMember {
                archive: path.to_path_buf(),
                member: member.name().to_string(),
            });
            continue;
        };

        let destination = target_dir.join(relative);
        if !claims.is_free(&destination) || extracted.contains(&destination) {
            warn!(
                archive = %path.display(),
                member = member.name(),
                destination = %destination.display(),
                "Skipping member that would overwrite a document of this run"
            );
            skipped.push(InputError::DuplicateMember {
                archive: path.to_path_buf(),
                member: member.name().to_string(),
                destination,
            });
            continue;
        }

        let mut data = Vec::new();
        if let Err(e) = member.read_to_end(&mut data) {
            diagnostics.push(open_failure(format!("{}: {}", member.name(), e)));
            return Ok(Vec::new());
        }

        write_member(&destination, &data)?;
        debug!(
            archive = %path.display(),
            destination = %destination.display(),
            "Extracted document"
        );
        extracted.push(destination);
    }

    for destination in &extracted {
        claims.claim(destination);
    }
    diagnostics.extend(skipped);
    Ok(extracted)
}

/// Directory that receives an archive's members: the archive's own.
fn extraction_dir(archive: &Path) -> PathBuf {
    match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_member(destination: &Path, data: &[u8]) -> Result<()> {
    let storage = |source: std::io::Error| ReportError::Storage {
        path: destination.to_path_buf(),
        source,
    };
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(storage)?;
    }
    fs::write(destination, data).map_err(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in members {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_documents_pass_through() {
        let expansion = expand_inputs(&["a.xml", "dir/B.XML"]).unwrap();
        assert_eq!(
            expansion.documents,
            vec![PathBuf::from("a.xml"), PathBuf::from("dir/B.XML")]
        );
        assert!(expansion.diagnostics.is_empty());
    }

    #[test]
    fn test_archive_with_three_documents_and_one_other_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("lote.zip");
        write_zip(
            &archive,
            &[
                ("nota1.xml", "<a/>"),
                ("leiame.txt", "not a document"),
                ("notas/", ""),
                ("notas/nota2.xml", "<b/>"),
                ("NOTA3.XML", "<c/>"),
            ],
        );

        let expansion = expand_inputs(&[&archive]).unwrap();

        assert_eq!(
            expansion.documents,
            vec![
                dir.path().join("nota1.xml"),
                dir.path().join("notas/nota2.xml"),
                dir.path().join("NOTA3.XML"),
            ]
        );
        assert!(expansion.diagnostics.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("notas/nota2.xml")).unwrap(), "<b/>");
        assert!(!dir.path().join("leiame.txt").exists());
    }

    #[test]
    fn test_archive_members_keep_input_position() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("lote.zip");
        write_zip(&archive, &[("x.xml", "<x/>"), ("y.xml", "<y/>")]);
        let first = dir.path().join("first.xml");
        let last = dir.path().join("last.xml");

        let expansion = expand_inputs(&[&first, &archive, &last]).unwrap();

        assert_eq!(
            expansion.documents,
            vec![
                first.clone(),
                dir.path().join("x.xml"),
                dir.path().join("y.xml"),
                last.clone(),
            ]
        );
    }

    #[test]
    fn test_corrupt_archive_is_recorded_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("corrupt.zip");
        fs::write(&corrupt, b"this is not a zip file").unwrap();
        let good = dir.path().join("good.zip");
        write_zip(&good, &[("ok.xml", "<ok/>")]);

        let expansion = expand_inputs(&[&corrupt, &good]).unwrap();

        assert_eq!(expansion.documents, vec![dir.path().join("ok.xml")]);
        assert_eq!(expansion.diagnostics.len(), 1);
        assert!(matches!(
            &expansion.diagnostics[0],
            InputError::ArchiveOpen { path, .. } if path == &corrupt
        ));
    }

    #[test]
    fn test_missing_archive_is_recorded() {
        let expansion = expand_inputs(&["/nonexistent/lote.zip"]).unwrap();
        assert!(expansion.documents.is_empty());
        assert!(matches!(expansion.diagnostics[0], InputError::ArchiveOpen { .. }));
    }

    #[test]
    fn test_unsupported_inputs_are_recorded() {
        let expansion = expand_inputs(&["notas.rar", "nota.xml", "planilha.csv"]).unwrap();
        assert_eq!(expansion.documents, vec![PathBuf::from("nota.xml")]);
        assert_eq!(
            expansion.diagnostics,
            vec![
                InputError::Unsupported {
                    path: PathBuf::from("notas.rar")
                },
                InputError::Unsupported {
                    path: PathBuf::from("planilha.csv")
                },
            ]
        );
    }

    #[test]
    fn test_unsafe_member_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("inner");
        fs::create_dir(&nested).unwrap();
        let archive = nested.join("lote.zip");
        write_zip(&archive, &[("../escape.xml", "<e/>"), ("safe.xml", "<s/>")]);

        let expansion = expand_inputs(&[&archive]).unwrap();

        assert_eq!(expansion.documents, vec![nested.join("safe.xml")]);
        assert!(!dir.path().join("escape.xml").exists());
        assert!(matches!(
            &expansion.diagnostics[0],
            InputError::UnsafeMember { member, .. } if member == "../escape.xml"
        ));
    }

    #[test]
    fn test_same_member_in_two_archives_is_extracted_once() {
        let dir = tempfile::tempdir().unwrap();
        let jan = dir.path().join("jan.zip");
        let feb = dir.path().join("feb.zip");
        write_zip(&jan, &[("nota.xml", "<jan/>")]);
        write_zip(&feb, &[("nota.xml", "<feb/>"), ("extra.xml", "<x/>")]);

        let expansion = expand_inputs(&[&jan, &feb]).unwrap();

        assert_eq!(
            expansion.documents,
            vec![dir.path().join("nota.xml"), dir.path().join("extra.xml")]
        );
        assert_eq!(fs::read_to_string(dir.path().join("nota.xml")).unwrap(), "<jan/>");
        assert_eq!(
            expansion.diagnostics,
            vec![InputError::DuplicateMember {
                archive: feb.clone(),
                member: "nota.xml".to_string(),
                destination: dir.path().join("nota.xml"),
            }]
        );
    }

    #[test]
    fn test_member_never_overwrites_document_input() {
        let dir = tempfile::tempdir().unwrap();
        let loose = dir.path().join("nota.xml");
        fs::write(&loose, "<loose/>").unwrap();
        let archive = dir.path().join("lote.zip");
        write_zip(&archive, &[("nota.xml", "<member/>")]);

        // The archive comes first but the loose document still wins.
        let expansion = expand_inputs(&[&archive, &loose]).unwrap();

        assert_eq!(expansion.documents, vec![loose.clone()]);
        assert_eq!(fs::read_to_string(&loose).unwrap(), "<loose/>");
        assert!(matches!(
            &expansion.diagnostics[0],
            InputError::DuplicateMember { destination, .. } if destination == &loose
        ));
    }

    #[test]
    fn test_repeated_document_input_is_dropped() {
        let expansion = expand_inputs(&["a.xml", "b.xml", "a.xml"]).unwrap();
        assert_eq!(
            expansion.documents,
            vec![PathBuf::from("a.xml"), PathBuf::from("b.xml")]
        );
        assert_eq!(
            expansion.diagnostics,
            vec![InputError::DuplicateInput {
                path: PathBuf::from("a.xml")
            }]
        );
    }

    #[test]
    fn test_empty_input() {
        let inputs: Vec<PathBuf> = Vec::new();
        assert_eq!(expand_inputs(&inputs).unwrap(), Expansion::default());
    }
}
