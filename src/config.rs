// src/config.rs
use clap::ValueEnum;
use serde::Serialize;
use std::time::Duration;

/// How hard cardinality and shape violations are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Malformed value blocks are skipped; surplus scalar values are dropped silently.
    Lenient,
    /// Malformed value blocks and empty compulsory fields fail the document.
    #[default]
    Standard,
    /// As `Standard`, and any scalar field with several values fails the document.
    Strict,
}

impl Strictness {
    pub fn skips_bad_value_blocks(self) -> bool {
        self == Strictness::Lenient
    }

    pub fn rejects_surplus_values(self) -> bool {
        self == Strictness::Strict
    }

    pub fn reports_surplus_values(self) -> bool {
        self != Strictness::Lenient
    }
}

/// Settings shared by every document of a run. Built once in `main`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strictness: Strictness,
    /// Wall-clock budget for extracting, sanitizing and validating one document.
    pub document_budget: Duration,
    /// Keep the unsanitized record alongside the sanitized one.
    pub keep_raw: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            document_budget: Duration::from_millis(5000),
            keep_raw: false,
        }
    }
}
