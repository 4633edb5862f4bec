// src/pipeline/mod.rs
//! Runs each notice through extract → sanitize → validate.
//!
//! Documents are processed one after another; a failing document is recorded
//! and the batch moves on.

use crate::config::PipelineConfig;
use crate::extractors::NoticeExtractor;
use crate::sanitizer::Sanitizer;
use crate::ted::Diagnostic;
use crate::ted::models::{NoticeRecord, RawRecord};
use crate::utils::error::PipelineError;
use crate::validation::{SchemaValidator, ValidationReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A document that made it through the pipeline, possibly flagged by validation.
#[derive(Debug, Clone)]
pub struct ProcessedNotice {
    pub path: PathBuf,
    pub record: NoticeRecord,
    /// Unsanitized record, kept only when the run dumps raw records.
    pub raw: Option<RawRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub report: Option<ValidationReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub processed: Vec<ProcessedNotice>,
    pub failures: Vec<DocumentFailure>,
}

impl BatchOutcome {
    pub fn flagged(&self) -> usize {
        self.processed.iter().filter(|n| n.report.is_some()).count()
    }
}

#[derive(Debug, Clone)]
pub struct NoticePipeline {
    config: PipelineConfig,
    extractor: NoticeExtractor,
    sanitizer: Sanitizer,
    validator: SchemaValidator,
}

impl NoticePipeline {
    pub fn new(config: PipelineConfig, validator: SchemaValidator) -> Self {
        Self {
            extractor: NoticeExtractor::new(config.strictness),
            sanitizer: Sanitizer::new(config.strictness),
            config,
            validator,
        }
    }

    /// Processes one document already in memory. `started` marks the start of its budget.
    pub fn process_xml(&self, path: &Path, xml: &str, started: Instant) -> Result<ProcessedNotice, PipelineError> {
        let extraction = self.extractor.extract_str(xml)?;
        self.check_budget(started)?;
        tracing::debug!("Extracted {}", path.display());

        let sanitized = self.sanitizer.sanitize(&extraction.record)?;
        self.check_budget(started)?;
        if sanitized.record.contract.is_other_notice() {
            tracing::debug!("Sanitized {} ({}): other notice, no contract body", path.display(), sanitized.record.doc_id);
        } else {
            tracing::debug!("Sanitized {} ({})", path.display(), sanitized.record.doc_id);
        }

        let mut diagnostics = extraction.diagnostics;
        diagnostics.extend(sanitized.diagnostics);
        if !diagnostics.is_empty() {
            tracing::debug!("{}: {} diagnostic(s)", path.display(), diagnostics.len());
        }

        let report = self.validator.report(path, &sanitized.record);
        if let Some(report) = &report {
            tracing::warn!(
                "{} ({}) failed validation with {} violation(s)",
                path.display(),
                report.doc_id,
                report.violations.len()
            );
        }

        Ok(ProcessedNotice {
            path: path.to_path_buf(),
            record: sanitized.record,
            raw: self.config.keep_raw.then_some(extraction.record),
            diagnostics,
            report,
        })
    }

    /// Reads and processes one file on the blocking pool under the document budget.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessedNotice, PipelineError> {
        let started = Instant::now();
        let xml = tokio::fs::read_to_string(path).await?;

        let pipeline = self.clone();
        let owned = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || pipeline.process_xml(&owned, &xml, started));

        match tokio::time::timeout(self.config.document_budget, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(PipelineError::Worker(join_err.to_string())),
            Err(_) => Err(self.budget_exceeded()),
        }
    }

    /// Processes `files` in order, collecting successes and failures.
    pub async fn run(&self, files: &[PathBuf]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (i, path) in files.iter().enumerate() {
            tracing::debug!("[{}/{}] {}", i + 1, files.len(), path.display());
            match self.process_file(path).await {
                Ok(notice) => outcome.processed.push(notice),
                Err(e) => {
                    tracing::error!("Failed to process {}: {}", path.display(), e);
                    outcome.failures.push(DocumentFailure { path: path.clone(), error: e.to_string() });
                }
            }
        }
        outcome
    }

    fn check_budget(&self, started: Instant) -> Result<(), PipelineError> {
        if started.elapsed() >= self.config.document_budget {
            return Err(self.budget_exceeded());
        }
        Ok(())
    }

    fn budget_exceeded(&self) -> PipelineError {
        PipelineError::BudgetExceeded(self.config.document_budget.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strictness;
    use crate::extractors::document::tests::{AWARD_NOTICE, OTHER_NOTICE};
    use crate::validation::{LookupField, LookupTables};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn pipeline(config: PipelineConfig) -> NoticePipeline {
        let lookups = LookupTables::default().with_table(LookupField::Country, ["BE"]);
        NoticePipeline::new(config, SchemaValidator::new(Arc::new(lookups)))
    }

    fn write(dir: &TempDir, name: &str, xml: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, xml).unwrap();
        path
    }

    #[test]
    fn test_run_keeps_input_order_and_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(&dir, "a.xml", AWARD_NOTICE),
            write(&dir, "b.xml", "<TED_EXPORT>"),
            write(&dir, "c.xml", OTHER_NOTICE),
            dir.path().join("missing.xml"),
        ];

        let outcome = tokio_test::block_on(pipeline(PipelineConfig::default()).run(&files));

        let ids: Vec<&str> = outcome.processed.iter().map(|n| n.record.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["000123-2016", "000999-2016"]);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].path, files[1]);
        assert!(outcome.failures[0].error.starts_with("Extraction failed"));
        assert!(outcome.failures[1].error.starts_with("I/O error"));
    }

    #[test]
    fn test_validation_flags_without_failing() {
        let dir = TempDir::new().unwrap();
        let files = vec![write(&dir, "other.xml", OTHER_NOTICE)];
        let outcome = tokio_test::block_on(pipeline(PipelineConfig::default()).run(&files));

        // FR is not in the country table.
        assert_eq!(outcome.flagged(), 1);
        let report = outcome.processed[0].report.as_ref().unwrap();
        assert_eq!(report.violations[0].field, "CODED_DATA.NOTICE_DATA.ISO_COUNTRY");
        assert!(outcome.processed[0].raw.is_none());
    }

    #[test]
    fn test_process_xml_collects_diagnostics_and_raw() {
        let config = PipelineConfig { keep_raw: true, ..PipelineConfig::default() };
        let notice = pipeline(config).process_xml(Path::new("a.xml"), AWARD_NOTICE, Instant::now()).unwrap();
        assert!(notice.raw.is_some());
        assert!(notice
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CurrencyMismatch { .. })));
        assert!(notice
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CoercionFailed { raw, .. } if raw == "not disclosed")));
    }

    #[test]
    fn test_budget_overrun_is_a_document_failure() {
        let dir = TempDir::new().unwrap();
        let files = vec![write(&dir, "a.xml", AWARD_NOTICE)];
        let config = PipelineConfig {
            strictness: Strictness::Standard,
            document_budget: Duration::ZERO,
            keep_raw: false,
        };
        let outcome = tokio_test::block_on(pipeline(config).run(&files));
        assert!(outcome.processed.is_empty());
        assert_eq!(outcome.failures[0].error, PipelineError::BudgetExceeded(0).to_string());
    }
}
