//! End-to-end report generation: expand inputs, extract, merge.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::expand_inputs;
use crate::batch::{CancellationToken, Coordinator, ProgressSink};
use crate::document::NfeExtractor;
use crate::error::{InputError, Result};
use crate::models::config::NfeConfig;
use crate::models::report::Aggregation;

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Inputs that were skipped before extraction.
    pub diagnostics: Vec<InputError>,

    /// Documents submitted to extraction, in submission order.
    pub documents: Vec<PathBuf>,

    /// Merged outcome of the extraction.
    pub aggregation: Aggregation,
}

/// Generate a report from a mixed list of documents and archives.
///
/// Blocks until every document has been processed; call it from a
/// blocking context when running inside an async runtime.
pub fn generate_report<P: AsRef<Path>>(
    inputs: &[P],
    config: &NfeConfig,
    progress: &dyn ProgressSink,
    cancel: Option<CancellationToken>,
) -> Result<RunReport> {
    config.validate()?;

    let expansion = expand_inputs(inputs)?;
    let extractor = NfeExtractor::from_config(&config.extraction);
    let mut coordinator = Coordinator::new(extractor).with_workers(config.batch.workers);
    if let Some(token) = cancel {
        coordinator = coordinator.with_cancellation(token);
    }

    let aggregation = coordinator.run(&expansion.documents, progress)?;
    info!(
        inputs = inputs.len(),
        documents = expansion.documents.len(),
        skipped_inputs = expansion.diagnostics.len(),
        failed_documents = aggregation.failures().len(),
        "Report generated"
    );

    Ok(RunReport {
        diagnostics: expansion.diagnostics,
        documents: expansion.documents,
        aggregation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::NoProgress;
    use crate::error::{DocumentError, ReportError};
    use crate::render::ReportFormatter;
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn nfe(emit: &str, timestamp: &str, items: &[(&str, &str)]) -> String {
        let dets: String = items
            .iter()
            .enumerate()
            .map(|(i, (description, amount))| {
                format!(
                    "<det nItem=\"{}\"><prod><xProd>{}</xProd><vProd>{}</vProd></prod></det>",
                    i + 1,
                    description,
                    amount
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe" versao="4.00">
  <NFe><infNFe versao="4.00">
    <ide><dhEmi>{timestamp}</dhEmi></ide>
    {emit}
    {dets}
  </infNFe></NFe>
</nfeProc>"#
        )
    }

    const EMIT_X: &str = r#"<emit><CNPJ>11222333000181</CNPJ><xNome>Emitente X LTDA</xNome>
        <xFant>Emitente X</xFant><enderEmit><xLgr>Rua A</xLgr><nro>10</nro>
        <xBairro>Centro</xBairro><xMun>Recife</xMun><UF>PE</UF></enderEmit></emit>"#;

    #[test]
    fn test_two_documents_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let doc_a = dir.path().join("docA.xml");
        let doc_b = dir.path().join("docB.xml");
        fs::write(&doc_a, nfe(EMIT_X, "2024-03-10T09:00:00-03:00", &[("Widget", "100.00")])).unwrap();
        fs::write(&doc_b, nfe("", "2024-03-11T09:00:00-03:00", &[("Gadget", "50.00")])).unwrap();

        let run = generate_report(&[&doc_a, &doc_b], &NfeConfig::default(), &NoProgress, None)
            .unwrap();
        let batch = run.aggregation.report().unwrap();
        let rendered = ReportFormatter::default().render(&batch.report);

        assert_eq!(rendered.issuer.legal_name, "Emitente X LTDA");
        assert_eq!(rendered.period, "03/2024");
        let rows: Vec<_> = rendered
            .items
            .iter()
            .map(|i| (i.description.as_str(), i.amount.as_str(), i.date.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Widget", "R$ 100.00", "10/03/2024"),
                ("Gadget", "R$ 50.00", "11/03/2024"),
            ]
        );
        assert_eq!(rendered.total, "R$ 150.00");
        assert_eq!(batch.warnings.len(), 1);
    }

    #[test]
    fn test_mixed_inputs_with_failures_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let loose = dir.path().join("avulsa.xml");
        fs::write(&loose, nfe(EMIT_X, "2024-05-02T10:00:00-03:00", &[("Cabo", "12.30")])).unwrap();

        let archive = dir.path().join("lote.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        zip.start_file("lote/n1.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(nfe("", "2024-05-03T10:00:00-03:00", &[("Fonte", "7.70")]).as_bytes())
            .unwrap();
        zip.start_file("lote/n2.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<nfeProc xmlns=\"http://www.portalfiscal.inf.br/nfe\"><NFe>")
            .unwrap();
        zip.start_file("lote/leiame.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"ignored").unwrap();
        zip.finish().unwrap();

        let ignored = dir.path().join("notas.rar");
        let config = NfeConfig::default();

        let run = generate_report(&[&loose, &archive, &ignored], &config, &NoProgress, None)
            .unwrap();

        assert_eq!(
            run.documents,
            vec![
                loose.clone(),
                dir.path().join("lote/n1.xml"),
                dir.path().join("lote/n2.xml"),
            ]
        );
        assert_eq!(
            run.diagnostics,
            vec![InputError::Unsupported { path: ignored }]
        );

        let batch = run.aggregation.report().unwrap();
        assert_eq!(batch.succeeded, 2);
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[0].cause, DocumentError::Malformed(_)));
        assert_eq!(
            ReportFormatter::default().render(&batch.report).total,
            "R$ 20.00"
        );
    }

    #[test]
    fn test_missing_line_amount_fails_only_its_document() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.xml");
        let broken = dir.path().join("broken.xml");
        let last = dir.path().join("last.xml");
        fs::write(&first, nfe(EMIT_X, "2024-07-01T09:00:00-03:00", &[("Widget", "10.00")])).unwrap();
        fs::write(
            &broken,
            nfe(EMIT_X, "2024-07-02T09:00:00-03:00", &[("Bolt", "3.00"), ("Nut", "")])
                .replace("<vProd></vProd>", ""),
        )
        .unwrap();
        fs::write(&last, nfe("", "2024-07-03T09:00:00-03:00", &[("Gadget", "5.50")])).unwrap();

        let run = generate_report(&[&first, &broken, &last], &NfeConfig::default(), &NoProgress, None)
            .unwrap();
        let batch = run.aggregation.report().unwrap();

        let descriptions: Vec<_> = batch
            .report
            .items()
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["Widget", "Gadget"]);
        assert_eq!(
            ReportFormatter::default().render(&batch.report).total,
            "R$ 15.50"
        );
        assert_eq!(batch.succeeded, 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].path, broken);
        assert_eq!(
            batch.failures[0].cause,
            DocumentError::MissingField {
                item: 2,
                field: "vProd"
            }
        );
    }

    #[test]
    fn test_oversized_amount_does_not_abort_run() {
        let dir = tempfile::tempdir().unwrap();
        let huge = dir.path().join("a.xml");
        let small = dir.path().join("b.xml");
        fs::write(
            &huge,
            nfe(EMIT_X, "2024-07-01T09:00:00-03:00", &[("Huge", "79228162514264337593543950335")]),
        )
        .unwrap();
        fs::write(&small, nfe(EMIT_X, "2024-07-01T09:00:00-03:00", &[("Small", "1")])).unwrap();

        let run = generate_report(&[&huge, &small], &NfeConfig::default(), &NoProgress, None)
            .unwrap();
        let batch = run.aggregation.report().unwrap();

        assert_eq!(batch.report.items().len(), 1);
        assert_eq!(
            ReportFormatter::default().render(&batch.report).total,
            "R$ 1.00"
        );
        assert!(matches!(
            batch.failures[0].cause,
            DocumentError::InvalidAmount { item: 1, .. }
        ));
    }

    #[test]
    fn test_same_member_in_two_archives_counts_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut archives = Vec::new();
        for (name, description, amount) in [("jan.zip", "FromJan", "10.00"), ("feb.zip", "FromFeb", "20.00")] {
            let archive = dir.path().join(name);
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            zip.start_file("nota.xml", SimpleFileOptions::default()).unwrap();
            zip.write_all(nfe(EMIT_X, "2024-01-10T09:00:00-03:00", &[(description, amount)]).as_bytes())
                .unwrap();
            zip.finish().unwrap();
            archives.push(archive);
        }

        let run = generate_report(&archives, &NfeConfig::default(), &NoProgress, None).unwrap();
        let batch = run.aggregation.report().unwrap();

        assert_eq!(run.documents, vec![dir.path().join("nota.xml")]);
        assert_eq!(batch.report.items()[0].description, "FromJan");
        assert_eq!(
            ReportFormatter::default().render(&batch.report).total,
            "R$ 10.00"
        );
        assert!(matches!(
            &run.diagnostics[..],
            [InputError::DuplicateMember { archive, .. }] if archive == &archives[1]
        ));
    }

    #[test]
    fn test_no_inputs_is_empty() {
        let inputs: Vec<PathBuf> = Vec::new();
        let run = generate_report(&inputs, &NfeConfig::default(), &NoProgress, None).unwrap();
        assert!(run.documents.is_empty());
        assert!(matches!(
            run.aggregation,
            Aggregation::Empty { submitted: 0, .. }
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = NfeConfig::default();
        config.extraction.namespace = String::new();
        let result = generate_report(&["a.xml"], &config, &NoProgress, None);
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("a.xml");
        fs::write(&doc, nfe(EMIT_X, "2024-03-10T09:00:00-03:00", &[("A", "1.00")])).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = generate_report(&[&doc], &NfeConfig::default(), &NoProgress, Some(token));

        assert!(matches!(
            result,
            Err(ReportError::Cancelled {
                completed: 0,
                total: 1
            })
        ));
    }
}
