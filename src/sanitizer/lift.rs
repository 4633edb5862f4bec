// src/sanitizer/lift.rs
use crate::extractors::accessor::{rule_for, FieldRule};
use crate::extractors::sections::{CODIF_RULES, CONTRACTOR_RULES, FLAG_RULES, NOTICE_RULES, OBJECT_RULES};
use crate::extractors::value;
use crate::ted::models::*;

/// Renders a canonical record back into the raw shape, so that sanitizing
/// can be re-applied to its own output.
pub fn lift(record: &NoticeRecord) -> RawRecord {
    let notice = &record.coded_data.notice_data;
    let codif = &record.coded_data.codif_data;
    let contract = &record.contract;

    let notice_fields = raw_fields(
        NOTICE_RULES,
        &[
            ("NO_DOC_OJS", one(&notice.no_doc_ojs)),
            ("ORIGINAL_NUTS", many(&notice.original_nuts)),
            ("ORIGINAL_CPV", many(&notice.original_cpv)),
            ("ISO_COUNTRY", one(&notice.iso_country)),
            ("IA_URL_GENERAL", opt(&notice.ia_url_general)),
            ("REF_NOTICE", many(&notice.ref_notice)),
        ],
    );
    let values_list = notice
        .values_list
        .as_ref()
        .map(|list| RawValuesList {
            global_value: list.global_value.as_ref().map(value::lift),
            contracts_value: list.contracts_value.iter().flatten().map(value::lift).collect(),
        })
        .unwrap_or_default();

    let codif_fields = raw_fields(
        CODIF_RULES,
        &[
            ("TD_DOCUMENT_TYPE", one(&codif.td_document_type)),
            ("AA_AUTHORITY_TYPE", one(&codif.aa_authority_type)),
            ("NC_CONTRACT_NATURE", one(&codif.nc_contract_nature)),
            ("PR_PROC", one(&codif.pr_proc)),
            ("RP_REGULATION", one(&codif.rp_regulation)),
            ("TY_TYPE_BID", one(&codif.ty_type_bid)),
            ("AC_AWARD_CRIT", one(&codif.ac_award_crit)),
            ("MA_MAIN_ACTIVITIES", many(&codif.ma_main_activities)),
            ("DS_DATE_DISPATCH", opt(&codif.ds_date_dispatch)),
            ("DIRECTIVE", opt(&codif.directive)),
        ],
    );

    let contract_object = contract.contract_object.as_ref().map(|object| {
        let mut fields = raw_fields(
            OBJECT_RULES,
            &[
                ("NUTS", many(&object.nuts)),
                ("NUTS_EXTRA", opt(&object.nuts_extra)),
                ("CPV_MAIN", opt(&object.cpv_main)),
            ],
        );
        for (key, flag) in [
            ("CONTRACT_COVERED_GPA", &object.contract_covered_gpa),
            ("CONCLUSION_FRAMEWORK_AGREEMENT", &object.conclusion_framework_agreement),
            ("CONTRACTS_DPS", &object.contracts_dps),
        ] {
            if let Some(rule) = rule_for(FLAG_RULES, key) {
                fields.insert(rule.key, opt(flag));
            }
        }
        RawContractObject { fields, contract_value: object.contract_value.as_ref().map(lift_contract_value) }
    });

    let awards_of_contract = contract
        .awards_of_contract
        .iter()
        .flatten()
        .map(|award| RawAward {
            contractor: award.contractor.as_ref().map(|c| {
                raw_fields(
                    CONTRACTOR_RULES,
                    &[
                        ("OFFICIALNAME", opt(&c.officialname)),
                        ("COUNTRY", opt(&c.country)),
                        ("ADDRESS", opt(&c.address)),
                        ("TOWN", opt(&c.town)),
                        ("POSTAL_CODE", opt(&c.postal_code)),
                    ],
                )
            }),
            contract_value: award.contract_value.as_ref().map(lift_contract_value),
        })
        .collect();

    RawRecord {
        doc_id: one(&record.doc_id),
        coded_data: RawCodedData {
            notice_data: RawNoticeData { fields: notice_fields, values_list },
            codif_data: codif_fields,
        },
        contract: RawContract {
            oth_not: one(&contract.oth_not),
            contracting_authority: opt(&contract.contracting_authority),
            contract_object,
            awards_of_contract,
        },
    }
}

fn lift_contract_value(value: &ContractValue) -> RawContractValue {
    let number = |n: &Option<f64>| -> Vec<String> { n.iter().map(|n| n.to_string()).collect() };
    RawContractValue {
        cost: value.cost.as_ref().map(value::lift),
        estimate: value.estimate.as_ref().map(value::lift),
        number_of_years: number(&value.number_of_years),
        number_of_months: number(&value.number_of_months),
    }
}

/// Builds section fields keyed by the rule table's own static keys.
fn raw_fields(rules: &[FieldRule], entries: &[(&str, Vec<String>)]) -> RawFields {
    let mut fields = RawFields::new();
    for (key, values) in entries {
        if let Some(rule) = rule_for(rules, key) {
            fields.insert(rule.key, values.clone());
        }
    }
    fields
}

fn one(value: &str) -> Vec<String> {
    vec![value.to_string()]
}

fn opt(value: &Option<String>) -> Vec<String> {
    value.iter().cloned().collect()
}

fn many(value: &Option<OneOrMany<String>>) -> Vec<String> {
    value.clone().map(OneOrMany::into_vec).unwrap_or_default()
}
