// src/validation/lookups.rs
use crate::utils::error::LookupError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Classification dimensions with an externally supplied list of valid codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupField {
    #[serde(rename = "ISO_COUNTRY")]
    Country,
    #[serde(rename = "CPV")]
    Cpv,
    #[serde(rename = "MA_MAIN_ACTIVITY")]
    MainActivity,
    #[serde(rename = "TD_DOCUMENT_TYPE")]
    DocumentType,
    #[serde(rename = "NC_CONTRACT_NATURE")]
    ContractNature,
    #[serde(rename = "AA_AUTHORITY_TYPE")]
    AuthorityType,
    #[serde(rename = "PR_PROC")]
    Procedure,
    #[serde(rename = "TY_TYPE_BID")]
    BidType,
    #[serde(rename = "AC_AWARD_CRIT")]
    AwardCriterion,
    #[serde(rename = "RP_REGULATION")]
    Regulation,
}

impl LookupField {
    pub const ALL: [LookupField; 10] = [
        LookupField::Country,
        LookupField::Cpv,
        LookupField::MainActivity,
        LookupField::DocumentType,
        LookupField::ContractNature,
        LookupField::AuthorityType,
        LookupField::Procedure,
        LookupField::BidType,
        LookupField::AwardCriterion,
        LookupField::Regulation,
    ];
}

/// Immutable sets of valid codes, one per [`LookupField`]. Loaded once per run.
///
/// The JSON form maps each table name to its list of codes:
/// `{"ISO_COUNTRY": ["BE", "FR"], "PR_PROC": ["1", "2"]}`.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    tables: HashMap<LookupField, HashSet<String>>,
}

impl LookupTables {
    pub fn from_json_str(json: &str) -> Result<Self, LookupError> {
        let raw: HashMap<LookupField, Vec<String>> = serde_json::from_str(json)?;
        let mut tables = Self::default();
        for (field, codes) in raw {
            tables = tables.with_table(field, codes);
        }
        Ok(tables)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LookupError> {
        let json = fs::read_to_string(path.as_ref())?;
        let tables = Self::from_json_str(&json)?;
        tracing::info!("Loaded {} lookup tables from {}", tables.tables.len(), path.as_ref().display());
        Ok(tables)
    }

    pub fn with_table<I, S>(mut self, field: LookupField, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = codes.into_iter().map(|c| c.into().trim().to_string()).collect();
        self.tables.insert(field, set);
        self
    }

    /// Tables that were not supplied; their membership checks are skipped.
    pub fn missing(&self) -> Vec<LookupField> {
        LookupField::ALL.into_iter().filter(|f| !self.tables.contains_key(f)).collect()
    }

    /// Whether `code` is a valid member. `None` when the table was not supplied.
    pub fn contains(&self, field: LookupField, code: &str) -> Option<bool> {
        self.tables.get(&field).map(|set| set.contains(code))
    }

    /// Whether `code` starts with a valid member, as NUTS codes start with a
    /// country code and CPV codes extend a CPV division.
    pub fn has_prefix(&self, field: LookupField, code: &str) -> Option<bool> {
        let set = self.tables.get(&field)?;
        Some(
            code.char_indices()
                .map(|(i, c)| &code[..i + c.len_utf8()])
                .any(|prefix| set.contains(prefix)),
        )
    }
}
