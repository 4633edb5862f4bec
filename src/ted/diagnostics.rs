// src/ted/diagnostics.rs
use serde::Serialize;
use std::fmt;

/// Advisory, non-fatal findings gathered while processing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A numeric field could not be parsed and was dropped.
    CoercionFailed { field: String, raw: String },
    /// A value record failed the currency-plus-amount invariant.
    ValueDropped { field: String, reason: String },
    /// A range carried two different currencies.
    CurrencyMismatch { field: String, currencies: Vec<String> },
    /// A scalar field carried more than one raw value; only the first was kept.
    ExtraValuesDiscarded { field: String, count: usize },
    /// A malformed value block was skipped during extraction.
    ValueShapeSkipped { field: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CoercionFailed { field, raw } => {
                write!(f, "{}: cannot convert {:?} to a number", field, raw)
            }
            Diagnostic::ValueDropped { field, reason } => write!(f, "{}: value dropped ({})", field, reason),
            Diagnostic::CurrencyMismatch { field, currencies } => {
                write!(f, "{}: range currencies disagree ({})", field, currencies.join(" vs "))
            }
            Diagnostic::ExtraValuesDiscarded { field, count } => {
                write!(f, "{}: {} values found, kept the first", field, count)
            }
            Diagnostic::ValueShapeSkipped { field, reason } => write!(f, "{}: skipped ({})", field, reason),
        }
    }
}
