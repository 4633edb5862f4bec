// src/extractors/sections.rs
//! Section extractors: each turns one subtree of a TED export into its raw section.

use crate::config::Strictness;
use crate::extractors::accessor::{
    extract_fields, is_named, node_text, select, select_first, values, Cardinality, FieldRule, Step,
};
use crate::extractors::value::{cost_block, values_entry};
use crate::ted::diagnostics::Diagnostic;
use crate::ted::models::{
    yes_no, RawAward, RawContract, RawContractObject, RawContractValue, RawFields, RawNoticeData,
    RawValue, RawValuesList, YES,
};
use crate::utils::error::ExtractError;
use roxmltree::Node;

use Cardinality::{Compulsory, Optional, Repeated};

// --- Rule tables ---

pub const NOTICE_RULES: &[FieldRule] = &[
    FieldRule::new("NO_DOC_OJS", &[Step::Child("NO_DOC_OJS"), Step::Text], Compulsory),
    FieldRule::new("ORIGINAL_NUTS", &[Step::Child("ORIGINAL_NUTS"), Step::Attr("CODE")], Repeated),
    FieldRule::new("ORIGINAL_CPV", &[Step::Child("ORIGINAL_CPV"), Step::Attr("CODE")], Repeated),
    FieldRule::new("ISO_COUNTRY", &[Step::Child("ISO_COUNTRY"), Step::Attr("VALUE")], Compulsory),
    FieldRule::new("IA_URL_GENERAL", &[Step::Child("IA_URL_GENERAL"), Step::Text], Optional),
    FieldRule::new("REF_NOTICE", &[Step::Child("REF_NOTICE"), Step::Child("NO_DOC_OJS"), Step::Text], Repeated),
];

pub const CODIF_RULES: &[FieldRule] = &[
    FieldRule::new("TD_DOCUMENT_TYPE", &[Step::Child("TD_DOCUMENT_TYPE"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("AA_AUTHORITY_TYPE", &[Step::Child("AA_AUTHORITY_TYPE"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("NC_CONTRACT_NATURE", &[Step::Child("NC_CONTRACT_NATURE"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("PR_PROC", &[Step::Child("PR_PROC"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("RP_REGULATION", &[Step::Child("RP_REGULATION"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("TY_TYPE_BID", &[Step::Child("TY_TYPE_BID"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("AC_AWARD_CRIT", &[Step::Child("AC_AWARD_CRIT"), Step::Attr("CODE")], Compulsory),
    FieldRule::new("MA_MAIN_ACTIVITIES", &[Step::Child("MA_MAIN_ACTIVITIES"), Step::Attr("CODE")], Repeated),
    FieldRule::new("DS_DATE_DISPATCH", &[Step::Child("DS_DATE_DISPATCH"), Step::Text], Optional),
    FieldRule::new("DIRECTIVE", &[Step::Child("DIRECTIVE"), Step::Attr("VALUE")], Optional),
];

pub const OBJECT_RULES: &[FieldRule] = &[
    FieldRule::new("NUTS", &[Step::Descendant("NUTS"), Step::Attr("CODE")], Repeated),
    FieldRule::new("NUTS_EXTRA", &[Step::Descendant("LOCATION"), Step::Child("P"), Step::Text], Repeated),
    FieldRule::new("CPV_MAIN", &[Step::Descendant("CPV_MAIN"), Step::Child("CPV_CODE"), Step::Attr("CODE")], Optional),
];

/// Presence flags of the contract object. The path locates the element; the
/// extracted value is `YES` or `NO`.
pub const FLAG_RULES: &[FieldRule] = &[
    FieldRule::new("CONTRACT_COVERED_GPA", &[Step::Descendant("CONTRACT_COVERED_GPA")], Optional),
    FieldRule::new("CONCLUSION_FRAMEWORK_AGREEMENT", &[Step::Descendant("CONCLUSION_FRAMEWORK_AGREEMENT")], Optional),
    FieldRule::new("CONTRACTS_DPS", &[Step::Descendant("CONTRACTS_DPS")], Optional),
];

pub const CONTRACTOR_RULES: &[FieldRule] = &[
    FieldRule::new("OFFICIALNAME", &[Step::Child("ORGANISATION"), Step::Child("OFFICIALNAME"), Step::Text], Optional),
    FieldRule::new("COUNTRY", &[Step::Child("COUNTRY"), Step::Attr("VALUE")], Optional),
    FieldRule::new("ADDRESS", &[Step::Child("ADDRESS"), Step::Text], Optional),
    FieldRule::new("TOWN", &[Step::Child("TOWN"), Step::Text], Optional),
    FieldRule::new("POSTAL_CODE", &[Step::Child("POSTAL_CODE"), Step::Text], Optional),
];

// --- Structural paths ---

/// Preferred translation order for the contract body.
pub const LANGUAGE_PREFERENCE: [&str; 3] = ["EN", "FR", "DE"];

/// `CONTACTING` is a misspelling found in real exports.
const AUTHORITY_PATH: &[Step] = &[
    Step::ChildWithPrefix(&["CONTRACTING", "CONTACTING", "AUTHORITY"]),
    Step::ChildWithPrefix(&["NAME"]),
    Step::Descendant("ORGANISATION"),
];
const OBJECT_PATH: &[Step] = &[Step::ChildWithPrefix(&["OBJECT"])];
const AWARD_PATH: &[Step] = &[Step::ChildWithPrefix(&["AWARD"])];
const CONTACT_PATH: &[Step] = &[
    Step::Child("ECONOMIC_OPERATOR_NAME_ADDRESS"),
    Step::Child("CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME"),
];
const CONTACT_CHP_PATH: &[Step] = &[Step::Child("CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME_CHP")];
const GPA_VALUE_PATH: &[Step] = &[Step::Descendant("CONTRACT_COVERED_GPA"), Step::Attr("VALUE")];

/// Extracts the semantic sections of one notice. Collects advisory diagnostics
/// for value blocks skipped under lenient strictness.
pub struct SectionExtractor {
    strictness: Strictness,
    notes: Vec<Diagnostic>,
}

impl SectionExtractor {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness, notes: Vec::new() }
    }

    /// Hands over the diagnostics gathered so far.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.notes
    }

    /// `NOTICE_DATA`: notice number, codes, country, URL, references and the values list.
    pub fn notice_data(&mut self, node: Node) -> Result<RawNoticeData, ExtractError> {
        let fields = extract_fields(node, NOTICE_RULES);

        let mut values_list = RawValuesList::default();
        if let Some(list) = node.children().find(|c| is_named(c, "VALUES_LIST")) {
            let entries = |kind: &'static str| {
                list.descendants()
                    .filter(move |d| is_named(d, "VALUES") && d.attribute("TYPE") == Some(kind))
            };
            if let Some(global) = entries("GLOBAL").next() {
                values_list.global_value = self.value_block(values_entry(global), "GLOBAL_VALUE")?;
            }
            for entry in entries("CONTRACT") {
                if let Some(value) = self.value_block(values_entry(entry), "CONTRACTS_VALUE")? {
                    values_list.contracts_value.push(value);
                }
            }
        }

        Ok(RawNoticeData { fields, values_list })
    }

    /// `CODIF_DATA`: the classification codes.
    pub fn codif_data(&self, node: Node) -> RawFields {
        extract_fields(node, CODIF_RULES)
    }

    /// `FORM_SECTION`: the contract body in the preferred language.
    pub fn contract(&mut self, form: Node) -> Result<RawContract, ExtractError> {
        if is_other_notice(form) {
            tracing::debug!("Form carries an OTH_NOT body, skipping contract extraction");
            return Ok(RawContract { oth_not: vec![YES.to_string()], ..RawContract::default() });
        }

        let variant = select_language(form)
            .ok_or_else(|| ExtractError::SectionNotFound("FORM_SECTION contract".to_string()))?;
        let body = variant
            .first_element_child()
            .ok_or_else(|| ExtractError::SectionNotFound(format!("{} body", variant.tag_name().name())))?;
        tracing::debug!("Selected contract body <{}> (LG={:?})", body.tag_name().name(), variant.attribute("LG"));

        let contract_object = match select_first(body, OBJECT_PATH) {
            Some(object) => Some(self.contract_object(object)?),
            None => None,
        };

        let mut awards_of_contract = Vec::new();
        for award in select(body, AWARD_PATH) {
            awards_of_contract.extend(self.awards(award)?);
        }

        Ok(RawContract {
            oth_not: vec![yes_no(false)],
            contracting_authority: contracting_authority(body),
            contract_object,
            awards_of_contract,
        })
    }

    /// `OBJECT_*`: location, main CPV, flags and the optional contract value.
    pub fn contract_object(&mut self, node: Node) -> Result<RawContractObject, ExtractError> {
        let mut fields = extract_fields(node, OBJECT_RULES);
        for rule in FLAG_RULES {
            let present = select_first(node, rule.path).is_some();
            let flag = if rule.key == "CONTRACT_COVERED_GPA" {
                values(node, GPA_VALUE_PATH).into_iter().next().unwrap_or_else(|| yes_no(present))
            } else {
                yes_no(present)
            };
            fields.insert(rule.key, vec![flag]);
        }

        let mut contract_value = None;
        if let Some(total) = node.children().find(|c| is_named(c, "TOTAL_FINAL_VALUE")) {
            contract_value = Some(self.contract_value(total)?);
        }
        if node.children().any(|c| is_named(&c, "COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE")) {
            contract_value = Some(self.contract_value(node)?);
        }

        Ok(RawContractObject { fields, contract_value })
    }

    /// One XML award element. An `AWARD_AND_CONTRACT_VALUE` wrapper yields one
    /// record per inner block, sharing the outer contractor when the block has none.
    pub fn awards(&mut self, award: Node) -> Result<Vec<RawAward>, ExtractError> {
        let wrapped: Vec<Node> = award.children().filter(|c| is_named(c, "AWARD_AND_CONTRACT_VALUE")).collect();
        if wrapped.is_empty() {
            return Ok(vec![self.award(award, None)?]);
        }
        wrapped.into_iter().map(|inner| self.award(inner, Some(award))).collect()
    }

    fn award(&mut self, node: Node, outer: Option<Node>) -> Result<RawAward, ExtractError> {
        let contact = contact_block(node).or_else(|| outer.and_then(contact_block));
        let contractor = contact.map(contractor).filter(|fields| !fields.is_empty());

        let value_info = node
            .descendants()
            .skip(1)
            .find(|d| is_named(d, "CONTRACT_VALUE_INFORMATION") || is_named(d, "INFORMATION_VALUE_CONTRACT"));
        let contract_value = match value_info {
            Some(info) => Some(self.contract_value(info)?),
            None => None,
        };

        Ok(RawAward { contractor, contract_value })
    }

    /// Final cost and/or initial estimate, plus duration.
    pub fn contract_value(&mut self, node: Node) -> Result<RawContractValue, ExtractError> {
        let mut value = RawContractValue::default();

        if let Some(cost) = node.children().find(|c| is_named(c, "COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE")) {
            value.cost = self.value_block(cost_block(cost), "COST")?;
        }
        if let Some(estimate) = node.children().find(|c| is_named(c, "INITIAL_ESTIMATED_TOTAL_VALUE_CONTRACT")) {
            value.estimate = self.value_block(cost_block(estimate), "ESTIMATE")?;
        }
        value.number_of_years = either_spelling(node, "NUMBER_OF_YEARS", "NUMBER_YEARS");
        value.number_of_months = either_spelling(node, "NUMBER_OF_MONTHS", "NUMBER_MONTHS");

        Ok(value)
    }

    /// Applies the strictness policy to a value block read.
    fn value_block(
        &mut self,
        read: Result<RawValue, ExtractError>,
        field: &str,
    ) -> Result<Option<RawValue>, ExtractError> {
        match read {
            Ok(value) => Ok(Some(value)),
            Err(err @ (ExtractError::MissingValueShape { .. } | ExtractError::AmbiguousValueShape { .. }))
                if self.strictness.skips_bad_value_blocks() =>
            {
                tracing::warn!("Skipping {}: {}", field, err);
                self.notes.push(Diagnostic::ValueShapeSkipped { field: field.to_string(), reason: err.to_string() });
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// True when the form's first child is the `OTH_NOT` marker.
pub fn is_other_notice(form: Node) -> bool {
    form.first_element_child().is_some_and(|child| is_named(&child, "OTH_NOT"))
}

/// Picks the language variant of the form: EN, then FR, then DE, then the first one.
pub fn select_language<'a, 'input>(form: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    LANGUAGE_PREFERENCE
        .iter()
        .find_map(|lg| form.children().find(|c| c.is_element() && c.attribute("LG") == Some(*lg)))
        .or_else(|| form.first_element_child())
}

/// Name of the contracting body, from the first matching organisation block.
pub fn contracting_authority(body: Node) -> Vec<String> {
    select_first(body, AUTHORITY_PATH).map(organisation_name).unwrap_or_default()
}

/// `OFFICIALNAME` text if present, else the organisation's own text.
fn organisation_name(organisation: Node) -> Vec<String> {
    let official = values(organisation, &[Step::Child("OFFICIALNAME"), Step::Text]);
    if official.is_empty() {
        node_text(organisation).map(str::to_string).into_iter().collect()
    } else {
        official
    }
}

fn contact_block<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    select_first(node, CONTACT_PATH).or_else(|| select_first(node, CONTACT_CHP_PATH))
}

fn contractor(contact: Node) -> RawFields {
    let mut fields = extract_fields(contact, CONTRACTOR_RULES);
    if fields.get("OFFICIALNAME").is_empty() {
        let bare = values(contact, &[Step::Child("ORGANISATION"), Step::Text]);
        fields.insert("OFFICIALNAME", bare);
    }
    fields
}

fn either_spelling(node: Node, modern: &str, legacy: &str) -> Vec<String> {
    node.descendants()
        .skip(1)
        .filter(|d| is_named(d, modern) || is_named(d, legacy))
        .filter_map(node_text)
        .map(str::to_string)
        .collect()
}
