// Report bundle: one upload evaluated under one filter, with everything a
// caller needs to print, serialize or download it.

use std::path::Path;

use serde::Serialize;
use stockcheck_recon::{Evaluation, LoadSummary, ReconError, ReconSession, RawWorkbook};

use crate::xlsx::{self, ExportOptions, ExportResult};

/// Identity of the uploaded workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    /// Display name (file name when read from disk)
    pub name: String,
    pub bytes: usize,
    /// blake3 of the raw file bytes, hex
    pub blake3: String,
}

impl SourceInfo {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.len(),
            blake3: blake3::hash(bytes).to_hex().to_string(),
        }
    }
}

/// A parsed and reconciled upload. Re-evaluate it for every filter change.
#[derive(Debug, Clone)]
pub struct Upload {
    pub source: SourceInfo,
    session: ReconSession,
}

impl Upload {
    /// Parse and reconcile a workbook held in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ReconError> {
        let source = SourceInfo::from_bytes(name, bytes);
        let (workbook, import) = xlsx::read_workbook(bytes)?;
        log::debug!(
            "read {} ({} bytes, {} sheet(s)) in {} ms",
            source.name,
            source.bytes,
            import.sheet_stats.len(),
            import.import_duration_ms
        );
        Self::from_workbook(source, &workbook)
    }

    pub fn from_workbook(source: SourceInfo, workbook: &RawWorkbook) -> Result<Self, ReconError> {
        let session = ReconSession::from_workbook(workbook)?;
        Ok(Self { source, session })
    }

    pub fn load_summary(&self) -> &LoadSummary {
        self.session.load_summary()
    }

    pub fn evaluate(&self, filter: &str) -> Evaluation {
        self.session.evaluate(filter)
    }

    /// Evaluate `filter` and build the report workbook for the result.
    pub fn report(&self, filter: &str, options: &ExportOptions) -> Result<ReportBundle, ReconError> {
        let evaluation = self.evaluate(filter);
        let (export, export_result) = xlsx::export_report(&evaluation.partitions, options)?;
        log::info!(
            "report for {}: {} row(s), {} with differences, {} byte workbook",
            self.source.name,
            evaluation.summary.total_rows,
            evaluation.summary.highlighted,
            export.len()
        );
        Ok(ReportBundle {
            meta: ReportMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                source: self.source.clone(),
            },
            load: self.load_summary().clone(),
            evaluation,
            export,
            export_result,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub run_at: String,
    pub source: SourceInfo,
}

/// Everything produced by one evaluation of an upload.
///
/// Serializes to the JSON report; the xlsx bytes are carried alongside but
/// never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct ReportBundle {
    pub meta: ReportMeta,
    pub load: LoadSummary,
    #[serde(flatten)]
    pub evaluation: Evaluation,
    #[serde(skip)]
    pub export: Vec<u8>,
    #[serde(skip)]
    pub export_result: ExportResult,
}

impl ReportBundle {
    /// Write the export workbook to `path`.
    pub fn write_export(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.export)
    }
}

/// Parse, reconcile, filter and export in one call.
pub fn build_report(
    name: &str,
    bytes: &[u8],
    filter: &str,
    options: &ExportOptions,
) -> Result<ReportBundle, ReconError> {
    Upload::from_bytes(name, bytes)?.report(filter, options)
}
