// src/sanitizer/mod.rs
//! Collapses a raw extraction record into the canonical [`NoticeRecord`].
//!
//! Every field is collapsed according to the cardinality declared in the
//! extraction rule tables: compulsory scalars must have a value, optional
//! scalars disappear when empty, repeated fields keep document order.
//! Value records are coerced to numbers and dropped when they cannot carry a
//! currency and an amount.

#[cfg(test)]
pub mod lift;
pub mod prune;

pub use prune::prune;

use crate::config::Strictness;
use crate::extractors::accessor::{Cardinality, FieldRule};
use crate::extractors::sections::{CODIF_RULES, CONTRACTOR_RULES, FLAG_RULES, NOTICE_RULES, OBJECT_RULES};
use crate::extractors::value::{self, to_number};
use crate::ted::diagnostics::Diagnostic;
use crate::ted::models::*;
use crate::utils::error::SanitizeError;
use std::collections::BTreeMap;

/// Canonical record of one document plus the advisory notes raised while sanitizing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub record: NoticeRecord,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    strictness: Strictness,
}

impl Sanitizer {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    /// Builds the canonical record. Fails only on cardinality violations.
    pub fn sanitize(&self, raw: &RawRecord) -> Result<Sanitized, SanitizeError> {
        let mut pass = Pass { strictness: self.strictness, notes: Vec::new() };
        let record = pass.record(raw)?;
        Ok(Sanitized { record, diagnostics: pass.notes })
    }
}

/// Section fields after cardinality collapse, taken out one by one.
struct Collapsed(BTreeMap<&'static str, OneOrMany<String>>);

impl Collapsed {
    fn scalar(&mut self, key: &str) -> Option<String> {
        match self.0.remove(key)? {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.into_iter().next(),
        }
    }

    fn required(&mut self, key: &str) -> Result<String, SanitizeError> {
        self.scalar(key).ok_or_else(|| SanitizeError::CompulsoryMissing(key.to_string()))
    }

    fn list(&mut self, key: &str) -> Option<OneOrMany<String>> {
        self.0.remove(key)
    }
}

/// State of one sanitizing run.
struct Pass {
    strictness: Strictness,
    notes: Vec<Diagnostic>,
}

impl Pass {
    fn record(&mut self, raw: &RawRecord) -> Result<NoticeRecord, SanitizeError> {
        let doc_id = self.scalar("DOC_ID", &raw.doc_id, Cardinality::Compulsory)?
            .ok_or_else(|| SanitizeError::CompulsoryMissing("DOC_ID".to_string()))?;

        let notice_data = self.notice_data(&raw.coded_data.notice_data)?;
        let codif_data = self.codif_data(&raw.coded_data.codif_data)?;
        let contract = self.contract(&raw.contract)?;

        Ok(NoticeRecord { doc_id, coded_data: CodedData { notice_data, codif_data }, contract })
    }

    fn notice_data(&mut self, raw: &RawNoticeData) -> Result<NoticeData, SanitizeError> {
        let mut fields = self.collapse("CODED_DATA.NOTICE_DATA", NOTICE_RULES, &raw.fields)?;
        Ok(NoticeData {
            no_doc_ojs: fields.required("NO_DOC_OJS")?,
            original_nuts: fields.list("ORIGINAL_NUTS"),
            original_cpv: fields.list("ORIGINAL_CPV"),
            iso_country: fields.required("ISO_COUNTRY")?,
            ia_url_general: fields.scalar("IA_URL_GENERAL"),
            ref_notice: fields.list("REF_NOTICE"),
            values_list: self.values_list(&raw.values_list),
        })
    }

    fn values_list(&mut self, raw: &RawValuesList) -> Option<ValuesList> {
        let base = "CODED_DATA.NOTICE_DATA.VALUES_LIST";
        let global_value = raw
            .global_value
            .as_ref()
            .and_then(|v| value::normalize(v, &format!("{}.GLOBAL_VALUE", base), &mut self.notes));
        let contracts: Vec<ValueRecord> = raw
            .contracts_value
            .iter()
            .enumerate()
            .filter_map(|(i, v)| value::normalize(v, &format!("{}.CONTRACTS_VALUE[{}]", base, i), &mut self.notes))
            .collect();
        let contracts_value = (!contracts.is_empty()).then_some(contracts);

        if global_value.is_none() && contracts_value.is_none() {
            return None;
        }
        Some(ValuesList { global_value, contracts_value })
    }

    fn codif_data(&mut self, raw: &RawFields) -> Result<CodifData, SanitizeError> {
        let mut fields = self.collapse("CODED_DATA.CODIF_DATA", CODIF_RULES, raw)?;
        Ok(CodifData {
            td_document_type: fields.required("TD_DOCUMENT_TYPE")?,
            aa_authority_type: fields.required("AA_AUTHORITY_TYPE")?,
            nc_contract_nature: fields.required("NC_CONTRACT_NATURE")?,
            pr_proc: fields.required("PR_PROC")?,
            rp_regulation: fields.required("RP_REGULATION")?,
            ty_type_bid: fields.required("TY_TYPE_BID")?,
            ac_award_crit: fields.required("AC_AWARD_CRIT")?,
            ma_main_activities: fields.list("MA_MAIN_ACTIVITIES"),
            ds_date_dispatch: fields.scalar("DS_DATE_DISPATCH"),
            directive: fields.scalar("DIRECTIVE"),
        })
    }

    fn contract(&mut self, raw: &RawContract) -> Result<Contract, SanitizeError> {
        let oth_not = self
            .scalar("CONTRACT.OTH_NOT", &raw.oth_not, Cardinality::Compulsory)?
            .ok_or_else(|| SanitizeError::CompulsoryMissing("CONTRACT.OTH_NOT".to_string()))?;

        if oth_not == YES {
            return Ok(Contract { oth_not, contracting_authority: None, contract_object: None, awards_of_contract: None });
        }

        let contracting_authority =
            self.scalar("CONTRACT.CONTRACTING_AUTHORITY", &raw.contracting_authority, Cardinality::Optional)?;

        let contract_object = match &raw.contract_object {
            Some(object) => Some(self.contract_object(object)?),
            None => None,
        };

        let mut awards = Vec::with_capacity(raw.awards_of_contract.len());
        for (i, award) in raw.awards_of_contract.iter().enumerate() {
            awards.push(self.award(award, &format!("CONTRACT.AWARDS_OF_CONTRACT[{}]", i))?);
        }

        Ok(Contract {
            oth_not,
            contracting_authority,
            contract_object,
            awards_of_contract: (!awards.is_empty()).then_some(awards),
        })
    }

    fn contract_object(&mut self, raw: &RawContractObject) -> Result<ContractObject, SanitizeError> {
        let base = "CONTRACT.CONTRACT_OBJECT";
        let mut fields = self.collapse(base, OBJECT_RULES, &raw.fields)?;
        let mut flags = self.collapse(base, FLAG_RULES, &raw.fields)?;

        let nuts_extra = fields.list("NUTS_EXTRA").map(|parts| parts.into_vec().join(" "));
        let contract_value = match &raw.contract_value {
            Some(value) => self.contract_value(value, &format!("{}.CONTRACT_VALUE", base))?,
            None => None,
        };

        Ok(ContractObject {
            nuts: fields.list("NUTS"),
            nuts_extra,
            cpv_main: fields.scalar("CPV_MAIN"),
            contract_covered_gpa: flags.scalar("CONTRACT_COVERED_GPA"),
            conclusion_framework_agreement: flags.scalar("CONCLUSION_FRAMEWORK_AGREEMENT"),
            contracts_dps: flags.scalar("CONTRACTS_DPS"),
            contract_value,
        })
    }

    fn award(&mut self, raw: &RawAward, base: &str) -> Result<Award, SanitizeError> {
        let contractor = match &raw.contractor {
            Some(fields) => {
                let mut fields = self.collapse(&format!("{}.CONTRACTOR", base), CONTRACTOR_RULES, fields)?;
                let contractor = Contractor {
                    officialname: fields.scalar("OFFICIALNAME"),
                    country: fields.scalar("COUNTRY"),
                    address: fields.scalar("ADDRESS"),
                    town: fields.scalar("TOWN"),
                    postal_code: fields.scalar("POSTAL_CODE"),
                };
                (!contractor.is_empty()).then_some(contractor)
            }
            None => None,
        };
        let contract_value = match &raw.contract_value {
            Some(value) => self.contract_value(value, &format!("{}.CONTRACT_VALUE", base))?,
            None => None,
        };
        Ok(Award { contractor, contract_value })
    }

    fn contract_value(&mut self, raw: &RawContractValue, base: &str) -> Result<Option<ContractValue>, SanitizeError> {
        let cost = raw.cost.as_ref().and_then(|v| value::normalize(v, &format!("{}.COST", base), &mut self.notes));
        let estimate =
            raw.estimate.as_ref().and_then(|v| value::normalize(v, &format!("{}.ESTIMATE", base), &mut self.notes));
        let number_of_years = self.number(&format!("{}.NUMBER_OF_YEARS", base), &raw.number_of_years)?;
        let number_of_months = self.number(&format!("{}.NUMBER_OF_MONTHS", base), &raw.number_of_months)?;

        let value = ContractValue { cost, estimate, number_of_years, number_of_months };
        Ok((!value.is_empty()).then_some(value))
    }

    /// Optional numeric scalar; unparseable text is dropped with a note.
    fn number(&mut self, field: &str, raw: &[String]) -> Result<Option<f64>, SanitizeError> {
        let Some(text) = self.scalar(field, raw, Cardinality::Optional)? else {
            return Ok(None);
        };
        match to_number(&text) {
            Ok(number) => Ok(Some(number)),
            Err(err) => {
                tracing::warn!("{}: {}", field, err);
                self.notes.push(Diagnostic::CoercionFailed { field: field.to_string(), raw: err.raw });
                Ok(None)
            }
        }
    }

    /// Collapses every field of a rule table.
    fn collapse(&mut self, base: &str, rules: &[FieldRule], raw: &RawFields) -> Result<Collapsed, SanitizeError> {
        let mut collapsed = BTreeMap::new();
        for rule in rules {
            let field = format!("{}.{}", base, rule.key);
            let values = raw.get(rule.key);
            let value = match rule.cardinality {
                Cardinality::Repeated => OneOrMany::from_vec(values.to_vec()),
                cardinality => self.scalar(&field, values, cardinality)?.map(OneOrMany::One),
            };
            if let Some(value) = value {
                collapsed.insert(rule.key, value);
            }
        }
        Ok(Collapsed(collapsed))
    }

    /// First value of a scalar field, enforcing its cardinality.
    fn scalar(&mut self, field: &str, values: &[String], cardinality: Cardinality) -> Result<Option<String>, SanitizeError> {
        match values {
            [] if cardinality == Cardinality::Compulsory => Err(SanitizeError::CompulsoryMissing(field.to_string())),
            [] => Ok(None),
            [only] => Ok(Some(only.clone())),
            [first, ..] => {
                if self.strictness.rejects_surplus_values() {
                    return Err(SanitizeError::TooManyValues { field: field.to_string(), count: values.len() });
                }
                if self.strictness.reports_surplus_values() {
                    tracing::debug!("{}: {} values, keeping the first", field, values.len());
                    self.notes.push(Diagnostic::ExtraValuesDiscarded { field: field.to_string(), count: values.len() });
                }
                Ok(Some(first.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::document::tests::{AWARD_NOTICE, OTHER_NOTICE};
    use crate::extractors::NoticeExtractor;
    use serde_json::json;

    fn sanitized(xml: &str, strictness: Strictness) -> Result<Sanitized, SanitizeError> {
        let raw = NoticeExtractor::new(strictness).extract_str(xml).unwrap().record;
        Sanitizer::new(strictness).sanitize(&raw)
    }

    #[test]
    fn test_award_notice_canonical_shape() {
        let Sanitized { record, diagnostics } = sanitized(AWARD_NOTICE, Strictness::Standard).unwrap();

        let notice = &record.coded_data.notice_data;
        assert_eq!(notice.no_doc_ojs, "2016/S 001-000123");
        assert_eq!(notice.original_nuts, Some(OneOrMany::One("BE100".to_string())));
        assert_eq!(
            notice.original_cpv,
            Some(OneOrMany::Many(vec!["45233140".to_string(), "45233141".to_string()]))
        );
        assert_eq!(notice.ref_notice, None);

        let values = notice.values_list.as_ref().unwrap();
        assert_eq!(
            values.global_value,
            Some(ValueRecord { currency: "EUR".into(), amount: Amount::Single { value: 1234.56 }, vat_prct: None })
        );
        // The EUR/USD range is dropped, the EUR/EUR range survives.
        assert_eq!(values.contracts_value.as_ref().map(Vec::len), Some(1));

        let object = record.contract.contract_object.as_ref().unwrap();
        let cost = object.contract_value.as_ref().unwrap().cost.as_ref().unwrap();
        assert_eq!(cost.amount, Amount::Single { value: 2_500_000.0 });
        assert_eq!(cost.vat_prct, Some(21.0));
        assert_eq!(object.nuts_extra, None);

        let awards = record.contract.awards_of_contract.as_ref().unwrap();
        let award_value = awards[0].contract_value.as_ref().unwrap();
        assert!(award_value.cost.is_some());
        assert!(award_value.estimate.is_none());

        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::CurrencyMismatch { .. })));
        assert!(diagnostics.iter().any(|d| matches!(d,
            Diagnostic::CoercionFailed { field, .. } if field.ends_with("ESTIMATE.VALUE"))));
    }

    #[test]
    fn test_other_notice_keeps_only_flag() {
        let record = sanitized(OTHER_NOTICE, Strictness::Standard).unwrap().record;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["CONTRACT"], json!({ "OTH_NOT": "YES" }));
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["CODED_DATA", "CONTRACT", "DOC_ID"]);
    }

    #[test]
    fn test_optional_list_collapses_by_arity() {
        let sanitize_codes = |codes: &[&str]| {
            let mut raw = NoticeExtractor::default().extract_str(OTHER_NOTICE).unwrap().record;
            raw.coded_data
                .notice_data
                .fields
                .insert("ORIGINAL_CPV", codes.iter().map(|c| c.to_string()).collect());
            let record = Sanitizer::default().sanitize(&raw).unwrap().record;
            serde_json::to_value(&record.coded_data.notice_data).unwrap()
        };
        assert!(sanitize_codes(&[]).get("ORIGINAL_CPV").is_none());
        assert_eq!(sanitize_codes(&["X"])["ORIGINAL_CPV"], json!("X"));
        assert_eq!(sanitize_codes(&["X", "Y"])["ORIGINAL_CPV"], json!(["X", "Y"]));
    }

    #[test]
    fn test_empty_compulsory_field_fails_document() {
        let mut raw = NoticeExtractor::default().extract_str(OTHER_NOTICE).unwrap().record;
        raw.coded_data.codif_data.insert("PR_PROC", vec![]);
        assert_eq!(
            Sanitizer::default().sanitize(&raw).unwrap_err(),
            SanitizeError::CompulsoryMissing("CODED_DATA.CODIF_DATA.PR_PROC".to_string())
        );
    }

    #[test]
    fn test_surplus_scalar_values_by_strictness() {
        let mut raw = NoticeExtractor::default().extract_str(OTHER_NOTICE).unwrap().record;
        raw.coded_data.notice_data.fields.insert("ISO_COUNTRY", vec!["FR".into(), "DE".into()]);

        let lenient = Sanitizer::new(Strictness::Lenient).sanitize(&raw).unwrap();
        assert_eq!(lenient.record.coded_data.notice_data.iso_country, "FR");
        assert!(lenient.diagnostics.is_empty());

        let standard = Sanitizer::new(Strictness::Standard).sanitize(&raw).unwrap();
        assert_eq!(standard.diagnostics.len(), 1);

        assert!(matches!(
            Sanitizer::new(Strictness::Strict).sanitize(&raw),
            Err(SanitizeError::TooManyValues { count: 2, .. })
        ));
    }

    #[test]
    fn test_surviving_values_satisfy_invariant() {
        let record = sanitized(AWARD_NOTICE, Strictness::Standard).unwrap().record;
        let mut all = Vec::new();
        if let Some(list) = &record.coded_data.notice_data.values_list {
            all.extend(list.global_value.iter());
            all.extend(list.contracts_value.iter().flatten());
        }
        let object_value = record.contract.contract_object.as_ref().and_then(|o| o.contract_value.as_ref());
        let award_values = record.contract.awards_of_contract.iter().flatten().filter_map(|a| a.contract_value.as_ref());
        for value in object_value.into_iter().chain(award_values) {
            all.extend(value.cost.iter());
            all.extend(value.estimate.iter());
        }
        assert!(!all.is_empty());
        for value in all {
            assert!(!value.currency.is_empty());
            let figures = value.amount.figures();
            assert!(!figures.is_empty());
            assert!(figures.iter().all(|f| f.is_finite()));
        }
    }

    #[test]
    fn test_sanitizing_is_idempotent() {
        for xml in [AWARD_NOTICE, OTHER_NOTICE] {
            let once = sanitized(xml, Strictness::Standard).unwrap().record;
            let twice = Sanitizer::default().sanitize(&lift::lift(&once)).unwrap();
            assert_eq!(twice.record, once);
            assert!(twice.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_nuts_extra_joined_into_one_string() {
        let mut raw = NoticeExtractor::default().extract_str(AWARD_NOTICE).unwrap().record;
        if let Some(object) = raw.contract.contract_object.as_mut() {
            object.fields.insert("NUTS_EXTRA", vec!["Brussels".into(), "Region".into()]);
        }
        let record = Sanitizer::default().sanitize(&raw).unwrap().record;
        assert_eq!(
            record.contract.contract_object.unwrap().nuts_extra,
            Some("Brussels Region".to_string())
        );
    }
}
