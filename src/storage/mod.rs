// src/storage/mod.rs
use crate::config::Strictness;
use crate::pipeline::{BatchOutcome, DocumentFailure, ProcessedNotice};
use crate::sanitizer::prune;
use crate::ted::diagnostics::Diagnostic;
use crate::validation::ValidationReport;
use crate::utils::error::StorageError;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const NOTICES_FILE: &str = "notices.jsonl";
const REPORTS_FILE: &str = "validation_reports.json";
const FAILURES_FILE: &str = "failures.json";
const DIAGNOSTICS_FILE: &str = "diagnostics.json";
const SUMMARY_FILE: &str = "run_summary.json";
const RAW_DIR: &str = "raw";

/// Counts written to `run_summary.json` at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub finished_at: String,
    pub strictness: Strictness,
    pub documents: usize,
    pub processed: usize,
    pub flagged: usize,
    pub failed: usize,
    pub diagnostics: usize,
}

impl RunSummary {
    pub fn new(outcome: &BatchOutcome, strictness: Strictness) -> Self {
        Self {
            finished_at: chrono::Utc::now().to_rfc3339(),
            strictness,
            documents: outcome.processed.len() + outcome.failures.len(),
            processed: outcome.processed.len(),
            flagged: outcome.flagged(),
            failed: outcome.failures.len(),
            diagnostics: outcome.processed.iter().map(|n| n.diagnostics.len()).sum(),
        }
    }
}

#[derive(Serialize)]
struct DocumentDiagnostics<'a> {
    path: &'a Path,
    doc_id: &'a str,
    diagnostics: &'a [Diagnostic],
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager writing below `base_dir`, creating it if needed.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }
        Ok(Self { base_dir: base_path })
    }

    /// Writes every output file of a run and returns its summary.
    pub fn save_outcome(&self, outcome: &BatchOutcome, strictness: Strictness) -> Result<RunSummary, StorageError> {
        self.save_notices(&outcome.processed)?;

        let reports: Vec<&ValidationReport> = outcome.processed.iter().filter_map(|n| n.report.as_ref()).collect();
        self.write_json(REPORTS_FILE, &reports)?;
        self.save_failures(&outcome.failures)?;
        self.save_diagnostics(&outcome.processed)?;

        for notice in &outcome.processed {
            if notice.raw.is_some() {
                self.save_raw(notice)?;
            }
        }

        let summary = RunSummary::new(outcome, strictness);
        self.write_json(SUMMARY_FILE, &summary)?;
        Ok(summary)
    }

    /// Sanitized records, pruned, one JSON document per line in input order.
    pub fn save_notices(&self, notices: &[ProcessedNotice]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(NOTICES_FILE);
        let file = fs::File::create(&file_path).map_err(StorageError::IoError)?;
        let mut writer = BufWriter::new(file);

        for notice in notices {
            let tree = pruned(&notice.record)?;
            let line = serde_json::to_string(&tree).map_err(|e| StorageError::SerializationError(e.to_string()))?;
            writeln!(writer, "{}", line).map_err(StorageError::IoError)?;
        }
        writer.flush().map_err(StorageError::IoError)?;

        tracing::info!("Saved {} records to {}", notices.len(), file_path.display());
        Ok(file_path)
    }

    pub fn save_failures(&self, failures: &[DocumentFailure]) -> Result<PathBuf, StorageError> {
        self.write_json(FAILURES_FILE, &failures)
    }

    /// Advisory notes per document; documents without notes are left out.
    pub fn save_diagnostics(&self, notices: &[ProcessedNotice]) -> Result<PathBuf, StorageError> {
        let entries: Vec<DocumentDiagnostics> = notices
            .iter()
            .filter(|n| !n.diagnostics.is_empty())
            .map(|n| DocumentDiagnostics { path: &n.path, doc_id: &n.record.doc_id, diagnostics: &n.diagnostics })
            .collect();
        self.write_json(DIAGNOSTICS_FILE, &entries)
    }

    /// Writes the pruned raw record of `notice` to `raw/<DOC_ID>.json`.
    pub fn save_raw(&self, notice: &ProcessedNotice) -> Result<PathBuf, StorageError> {
        let raw_dir = self.base_dir.join(RAW_DIR);
        if !raw_dir.exists() {
            fs::create_dir_all(&raw_dir).map_err(StorageError::IoError)?;
        }

        let tree = match &notice.raw {
            Some(raw) => pruned(raw)?,
            None => Value::Null,
        };
        let file_path = raw_dir.join(format!("{}.json", file_stem(&notice.record.doc_id)));
        write_pretty(&file_path, &tree)?;

        tracing::debug!("Saved raw record to {}", file_path.display());
        Ok(file_path)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(name);
        write_pretty(&file_path, value)?;
        tracing::info!("Saved {}", file_path.display());
        Ok(file_path)
    }
}

fn pruned<T: Serialize>(value: &T) -> Result<Value, StorageError> {
    let mut tree = serde_json::to_value(value).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    prune(&mut tree);
    Ok(tree)
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    fs::write(path, text).map_err(StorageError::IoError)
}

/// DOC_IDs look like `000123-2016`; anything outside `[A-Za-z0-9_-]` becomes `_`.
fn file_stem(doc_id: &str) -> String {
    doc_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::extractors::document::tests::{AWARD_NOTICE, OTHER_NOTICE};
    use crate::pipeline::NoticePipeline;
    use crate::validation::{LookupField, LookupTables, SchemaValidator};
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::TempDir;

    fn outcome() -> BatchOutcome {
        let lookups = LookupTables::default().with_table(LookupField::Country, ["BE"]);
        let config = PipelineConfig { keep_raw: true, ..PipelineConfig::default() };
        let pipeline = NoticePipeline::new(config, SchemaValidator::new(Arc::new(lookups)));
        let processed = [("a.xml", AWARD_NOTICE), ("b.xml", OTHER_NOTICE)]
            .into_iter()
            .map(|(name, xml)| pipeline.process_xml(Path::new(name), xml, Instant::now()).unwrap())
            .collect();
        BatchOutcome {
            processed,
            failures: vec![DocumentFailure { path: PathBuf::from("c.xml"), error: "Extraction failed".into() }],
        }
    }

    fn read_json(path: PathBuf) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_save_outcome_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path().join("out")).unwrap();
        let summary = storage.save_outcome(&outcome(), Strictness::Standard).unwrap();

        assert_eq!((summary.documents, summary.processed, summary.flagged, summary.failed), (3, 2, 1, 1));

        let out = dir.path().join("out");
        let lines: Vec<Value> = fs::read_to_string(out.join(NOTICES_FILE))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["DOC_ID"], "000123-2016");
        assert_eq!(lines[1]["CONTRACT"], serde_json::json!({ "OTH_NOT": "YES" }));

        let reports = read_json(out.join(REPORTS_FILE));
        assert_eq!(reports.as_array().unwrap().len(), 1);
        assert_eq!(reports[0]["doc_id"], "000999-2016");
        assert_eq!(read_json(out.join(FAILURES_FILE))[0]["path"], "c.xml");
        assert_eq!(read_json(out.join(DIAGNOSTICS_FILE))[0]["doc_id"], "000123-2016");
        assert_eq!(read_json(out.join(SUMMARY_FILE))["strictness"], "standard");
        assert!(out.join(RAW_DIR).join("000123-2016.json").exists());
    }

    #[test]
    fn test_raw_dump_is_pruned() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let outcome = outcome();
        let raw = read_json(storage.save_raw(&outcome.processed[1]).unwrap());
        assert_eq!(raw["CONTRACT"], serde_json::json!({ "OTH_NOT": ["YES"] }));
        assert!(raw["CODED_DATA"]["NOTICE_DATA"].get("REF_NOTICE").is_none());
    }

    #[test]
    fn test_file_stem_replaces_separators() {
        assert_eq!(file_stem("000123-2016"), "000123-2016");
        assert_eq!(file_stem("a/b c"), "a_b_c");
    }
}
