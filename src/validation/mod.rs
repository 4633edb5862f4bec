// src/validation/mod.rs
//! Schema checks on sanitized records.
//!
//! Validation never fails a document: every violation is collected into a
//! [`ValidationReport`] and the record is kept, flagged.

pub mod lookups;

pub use lookups::{LookupField, LookupTables};

use crate::ted::models::{
    Award, CodifData, ContractObject, ContractValue, NoticeData, NoticeRecord, OneOrMany, ValueRecord, NO, YES,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Currencies accepted in value records.
pub const CURRENCIES: &[&str] = &[
    "EUR", "BGN", "CHF", "USD", "HRK", "CZK", "DKK", "HUF", "SEK", "NOK", "LTL", "TRY", "PLN", "MKD", "RON",
    "JPY", "ISK", "SKK", "LVL", "GBP", "MTL", "CYP", "EEK",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

/// All violations found in one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub doc_id: String,
    pub violations: Vec<Violation>,
}

/// Checks sanitized records against structural and lookup-table constraints.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    lookups: Arc<LookupTables>,
}

impl SchemaValidator {
    pub fn new(lookups: Arc<LookupTables>) -> Self {
        let missing = lookups.missing();
        if !missing.is_empty() {
            tracing::warn!("No lookup table for {:?}; membership checks skipped for these fields", missing);
        }
        Self { lookups }
    }

    /// Report for `record`, or `None` when it is valid.
    pub fn report(&self, path: &Path, record: &NoticeRecord) -> Option<ValidationReport> {
        let violations = self.validate(record);
        if violations.is_empty() {
            return None;
        }
        Some(ValidationReport { path: path.to_path_buf(), doc_id: record.doc_id.clone(), violations })
    }

    pub fn validate(&self, record: &NoticeRecord) -> Vec<Violation> {
        let mut check = Checker { lookups: &self.lookups, violations: Vec::new() };

        check.non_empty("DOC_ID", &record.doc_id);
        check.notice_data(&record.coded_data.notice_data);
        check.codif_data(&record.coded_data.codif_data);

        let contract = &record.contract;
        check.yes_no("CONTRACT.OTH_NOT", &contract.oth_not);
        if let Some(authority) = &contract.contracting_authority {
            check.non_empty("CONTRACT.CONTRACTING_AUTHORITY", authority);
        }
        if let Some(object) = &contract.contract_object {
            check.contract_object(object);
        }
        for (i, award) in contract.awards_of_contract.iter().flatten().enumerate() {
            check.award(&format!("CONTRACT.AWARDS_OF_CONTRACT[{}]", i), award);
        }

        check.violations
    }
}

struct Checker<'a> {
    lookups: &'a LookupTables,
    violations: Vec<Violation>,
}

impl Checker<'_> {
    fn flag(&mut self, field: &str, reason: impl Into<String>) {
        self.violations.push(Violation { field: field.to_string(), reason: reason.into() });
    }

    fn non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.flag(field, "empty string");
        }
    }

    fn yes_no(&mut self, field: &str, value: &str) {
        if value != YES && value != NO {
            self.flag(field, format!("{:?} is not YES or NO", value));
        }
    }

    fn member(&mut self, field: &str, table: LookupField, code: &str) {
        if self.lookups.contains(table, code) == Some(false) {
            self.flag(field, format!("{:?} is not a valid {:?} code", code, table));
        }
    }

    fn prefixed(&mut self, field: &str, table: LookupField, code: &str) {
        if self.lookups.has_prefix(table, code) == Some(false) {
            self.flag(field, format!("{:?} does not start with a valid {:?} code", code, table));
        }
    }

    fn country(&mut self, field: &str, code: &str) {
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            self.flag(field, format!("{:?} is not a 2-letter country code", code));
        } else {
            self.member(field, LookupField::Country, code);
        }
    }

    fn each(&mut self, field: &str, values: &Option<OneOrMany<String>>, mut check: impl FnMut(&mut Self, &str, &str)) {
        for (i, value) in values.iter().flat_map(OneOrMany::iter).enumerate() {
            check(self, &format!("{}[{}]", field, i), value.as_str());
        }
    }

    fn notice_data(&mut self, notice: &NoticeData) {
        let base = "CODED_DATA.NOTICE_DATA";
        self.non_empty(&format!("{}.NO_DOC_OJS", base), &notice.no_doc_ojs);
        self.each(&format!("{}.ORIGINAL_NUTS", base), &notice.original_nuts, |c, f, v| {
            c.prefixed(f, LookupField::Country, v)
        });
        self.each(&format!("{}.ORIGINAL_CPV", base), &notice.original_cpv, |c, f, v| {
            c.prefixed(f, LookupField::Cpv, v)
        });
        self.country(&format!("{}.ISO_COUNTRY", base), &notice.iso_country);
        if let Some(url) = &notice.ia_url_general {
            self.non_empty(&format!("{}.IA_URL_GENERAL", base), url);
        }
        self.each(&format!("{}.REF_NOTICE", base), &notice.ref_notice, |c, f, v| c.non_empty(f, v));

        if let Some(values) = &notice.values_list {
            if let Some(global) = &values.global_value {
                self.value(&format!("{}.VALUES_LIST.GLOBAL_VALUE", base), global);
            }
            for (i, value) in values.contracts_value.iter().flatten().enumerate() {
                self.value(&format!("{}.VALUES_LIST.CONTRACTS_VALUE[{}]", base, i), value);
            }
        }
    }

    fn codif_data(&mut self, codif: &CodifData) {
        let base = "CODED_DATA.CODIF_DATA";
        for (key, table, code) in [
            ("TD_DOCUMENT_TYPE", LookupField::DocumentType, &codif.td_document_type),
            ("AA_AUTHORITY_TYPE", LookupField::AuthorityType, &codif.aa_authority_type),
            ("NC_CONTRACT_NATURE", LookupField::ContractNature, &codif.nc_contract_nature),
            ("PR_PROC", LookupField::Procedure, &codif.pr_proc),
            ("RP_REGULATION", LookupField::Regulation, &codif.rp_regulation),
            ("TY_TYPE_BID", LookupField::BidType, &codif.ty_type_bid),
            ("AC_AWARD_CRIT", LookupField::AwardCriterion, &codif.ac_award_crit),
        ] {
            self.member(&format!("{}.{}", base, key), table, code);
        }
        self.each(&format!("{}.MA_MAIN_ACTIVITIES", base), &codif.ma_main_activities, |c, f, v| {
            c.member(f, LookupField::MainActivity, v)
        });
        if let Some(date) = &codif.ds_date_dispatch {
            if NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
                self.flag(&format!("{}.DS_DATE_DISPATCH", base), format!("{:?} is not a yyyymmdd date", date));
            }
        }
    }

    fn contract_object(&mut self, object: &ContractObject) {
        let base = "CONTRACT.CONTRACT_OBJECT";
        self.each(&format!("{}.NUTS", base), &object.nuts, |c, f, v| c.prefixed(f, LookupField::Country, v));
        if let Some(cpv) = &object.cpv_main {
            self.prefixed(&format!("{}.CPV_MAIN", base), LookupField::Cpv, cpv);
        }
        for (key, flag) in [
            ("CONTRACT_COVERED_GPA", &object.contract_covered_gpa),
            ("CONCLUSION_FRAMEWORK_AGREEMENT", &object.conclusion_framework_agreement),
            ("CONTRACTS_DPS", &object.contracts_dps),
        ] {
            if let Some(flag) = flag {
                self.yes_no(&format!("{}.{}", base, key), flag);
            }
        }
        if let Some(value) = &object.contract_value {
            self.contract_value(&format!("{}.CONTRACT_VALUE", base), value);
        }
    }

    fn award(&mut self, base: &str, award: &Award) {
        if let Some(contractor) = &award.contractor {
            if let Some(country) = &contractor.country {
                self.country(&format!("{}.CONTRACTOR.COUNTRY", base), country);
            }
            if let Some(name) = &contractor.officialname {
                self.non_empty(&format!("{}.CONTRACTOR.OFFICIALNAME", base), name);
            }
        }
        if let Some(value) = &award.contract_value {
            self.contract_value(&format!("{}.CONTRACT_VALUE", base), value);
        }
    }

    fn contract_value(&mut self, base: &str, value: &ContractValue) {
        if let Some(cost) = &value.cost {
            self.value(&format!("{}.COST", base), cost);
        }
        if let Some(estimate) = &value.estimate {
            self.value(&format!("{}.ESTIMATE", base), estimate);
        }
        for (key, duration) in [("NUMBER_OF_YEARS", value.number_of_years), ("NUMBER_OF_MONTHS", value.number_of_months)] {
            if duration.is_some_and(|d| !d.is_finite() || d < 0.0) {
                self.flag(&format!("{}.{}", base, key), "duration must be a non-negative number");
            }
        }
    }

    fn value(&mut self, field: &str, value: &ValueRecord) {
        if !CURRENCIES.contains(&value.currency.as_str()) {
            self.flag(&format!("{}.CURRENCY", field), format!("{:?} is not an accepted currency", value.currency));
        }
        let figures = value.amount.figures();
        if figures.is_empty() {
            self.flag(field, "no amount");
        }
        if figures.iter().chain(value.vat_prct.iter()).any(|f| !f.is_finite()) {
            self.flag(field, "amount is not a finite number");
        }
    }
}
