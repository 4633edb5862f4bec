// src/ted/models.rs
//! Record shapes for one TED notice.
//!
//! `Raw*` types hold what the extractors read from the XML: every field is a
//! list in document order, possibly empty. The sanitized types hold the
//! canonical shape consumers depend on; absent optional fields are omitted
//! when serialized.
use serde::Serialize;
use std::collections::BTreeMap;

/// A field that may carry one or several values once sanitized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Collapses a list by arity: empty → `None`, one → `One`, more → `Many`.
    pub fn from_vec(mut values: Vec<T>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(values)),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

// --- Raw (ragged) extraction record ---

/// Flat section fields keyed by their canonical name, as produced by a rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawFields(BTreeMap<&'static str, Vec<String>>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, values: Vec<String>) {
        self.0.insert(key, values);
    }

    /// Values for `key`, empty when the key was never extracted.
    pub fn get(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawRecord {
    pub doc_id: Vec<String>,
    pub coded_data: RawCodedData,
    pub contract: RawContract,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawCodedData {
    pub notice_data: RawNoticeData,
    pub codif_data: RawFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawNoticeData {
    #[serde(flatten)]
    pub fields: RawFields,
    pub values_list: RawValuesList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawValuesList {
    pub global_value: Option<RawValue>,
    pub contracts_value: Vec<RawValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawContract {
    pub oth_not: Vec<String>,
    pub contracting_authority: Vec<String>,
    pub contract_object: Option<RawContractObject>,
    pub awards_of_contract: Vec<RawAward>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawContractObject {
    #[serde(flatten)]
    pub fields: RawFields,
    pub contract_value: Option<RawContractValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawContractValue {
    pub cost: Option<RawValue>,
    pub estimate: Option<RawValue>,
    pub number_of_years: Vec<String>,
    pub number_of_months: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawAward {
    pub contractor: Option<RawFields>,
    pub contract_value: Option<RawContractValue>,
}

/// Monetary block as read from the document, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawValue {
    /// Every currency attribute seen for this block (two for a range read from `VALUE` pairs).
    pub currencies: Vec<String>,
    #[serde(flatten)]
    pub amount: RawAmount,
    pub vat_prct: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawAmount {
    Single {
        #[serde(rename = "VALUE")]
        value: Vec<String>,
    },
    Range {
        #[serde(rename = "LOW_VALUE")]
        low_value: Vec<String>,
        #[serde(rename = "HIGH_VALUE")]
        high_value: Vec<String>,
    },
}

// --- Sanitized (canonical) record ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NoticeRecord {
    pub doc_id: String,
    pub coded_data: CodedData,
    pub contract: Contract,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CodedData {
    pub notice_data: NoticeData,
    pub codif_data: CodifData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NoticeData {
    pub no_doc_ojs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_nuts: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_cpv: Option<OneOrMany<String>>,
    pub iso_country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ia_url_general: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_notice: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_list: Option<ValuesList>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ValuesList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_value: Option<ValueRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts_value: Option<Vec<ValueRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CodifData {
    pub td_document_type: String,
    pub aa_authority_type: String,
    pub nc_contract_nature: String,
    pub pr_proc: String,
    pub rp_regulation: String,
    pub ty_type_bid: String,
    pub ac_award_crit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma_main_activities: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ds_date_dispatch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Contract {
    pub oth_not: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracting_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_object: Option<ContractObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards_of_contract: Option<Vec<Award>>,
}

impl Contract {
    /// True for "other notice" records with no structured contract body.
    pub fn is_other_notice(&self) -> bool {
        self.oth_not == YES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ContractObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nuts: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nuts_extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpv_main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_covered_gpa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion_framework_agreement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts_dps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_value: Option<ContractValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ContractValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<ValueRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<ValueRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_months: Option<f64>,
}

impl ContractValue {
    pub fn is_empty(&self) -> bool {
        self.cost.is_none()
            && self.estimate.is_none()
            && self.number_of_years.is_none()
            && self.number_of_months.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Award {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<Contractor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_value: Option<ContractValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Contractor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub officialname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Contractor {
    pub fn is_empty(&self) -> bool {
        *self == Contractor::default()
    }
}

/// Canonical monetary record. Always carries a currency and at least one amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ValueRecord {
    pub currency: String,
    #[serde(flatten)]
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_prct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Amount {
    Single {
        #[serde(rename = "VALUE")]
        value: f64,
    },
    Range {
        #[serde(rename = "LOW_VALUE", skip_serializing_if = "Option::is_none")]
        low_value: Option<f64>,
        #[serde(rename = "HIGH_VALUE", skip_serializing_if = "Option::is_none")]
        high_value: Option<f64>,
    },
}

impl Amount {
    /// Every amount present, in VALUE / LOW / HIGH order.
    pub fn figures(&self) -> Vec<f64> {
        match self {
            Amount::Single { value } => vec![*value],
            Amount::Range { low_value, high_value } => {
                low_value.iter().chain(high_value.iter()).copied().collect()
            }
        }
    }
}

pub const YES: &str = "YES";
pub const NO: &str = "NO";

/// Renders a presence test as the YES/NO flag used throughout TED records.
pub fn yes_no(present: bool) -> String {
    if present { YES } else { NO }.to_string()
}
