// src/extractors/value.rs
//! Monetary value blocks: reading them from XML and turning them into [`ValueRecord`]s.
//!
//! TED uses two layouts for money:
//! - `VALUES` entries of `VALUES_LIST`, holding either `SINGLE_VALUE/VALUE` or
//!   `RANGE_VALUE/VALUE[1..2]`, with `CURRENCY` on each `VALUE`;
//! - cost blocks (`COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE`,
//!   `INITIAL_ESTIMATED_TOTAL_VALUE_CONTRACT`) with `CURRENCY` on the block and
//!   either `VALUE_COST` or `RANGE_VALUE_COST/{LOW_VALUE,HIGH_VALUE}`.
//!
//! In both layouts exactly one of the single/range shapes must be present.

use crate::extractors::accessor::{is_named, node_text, values, Step};
use crate::ted::diagnostics::Diagnostic;
use crate::ted::models::{Amount, RawAmount, RawValue, ValueRecord};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use thiserror::Error;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s").expect("Failed to compile WHITESPACE_RE")
});

const VAT_PATH: &[Step] = &[Step::Descendant("VAT_PRCT"), Step::Text];

#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {raw:?} to a number")]
pub struct CoercionError {
    pub raw: String,
}

/// Parses a TED amount such as `"1 234,56"` or `"19,6 %"`.
pub fn to_number(raw: &str) -> Result<f64, CoercionError> {
    let cleaned = WHITESPACE_RE.replace_all(raw, "").replace(',', ".").replace('%', "");
    match cleaned.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(CoercionError { raw: raw.to_string() }),
    }
}

/// Reads one `VALUES` entry of a `VALUES_LIST`.
pub fn values_entry(node: Node) -> Result<RawValue, ExtractError> {
    let single = node.children().find(|c| is_named(c, "SINGLE_VALUE"));
    let range = node.children().find(|c| is_named(c, "RANGE_VALUE"));

    let (currencies, amount) = match (single, range) {
        (Some(single), None) => {
            let value = single.descendants().find(|d| is_named(d, "VALUE"));
            let currency = value
                .and_then(|v| v.attribute("CURRENCY"))
                .or_else(|| inherited_currency(single));
            let amount = RawAmount::Single {
                value: value.and_then(node_text).map(str::to_string).into_iter().collect(),
            };
            (currency.map(str::to_string).into_iter().collect(), amount)
        }
        (None, Some(range)) => {
            let bounds: Vec<Node> = range.descendants().filter(|d| is_named(d, "VALUE")).collect();
            let mut currencies: Vec<String> = bounds
                .iter()
                .take(2)
                .filter_map(|b| b.attribute("CURRENCY"))
                .map(str::to_string)
                .collect();
            if currencies.is_empty() {
                currencies.extend(inherited_currency(range).map(str::to_string));
            }
            let text_of = |i: usize| -> Vec<String> {
                bounds.get(i).and_then(|b| node_text(*b)).map(str::to_string).into_iter().collect()
            };
            (currencies, RawAmount::Range { low_value: text_of(0), high_value: text_of(1) })
        }
        (None, None) => return Err(ExtractError::MissingValueShape { element: element_name(node) }),
        (Some(_), Some(_)) => return Err(ExtractError::AmbiguousValueShape { element: element_name(node) }),
    };

    Ok(RawValue { currencies, amount, vat_prct: values(node, VAT_PATH) })
}

/// Reads a cost block carrying its currency on the block element.
pub fn cost_block(node: Node) -> Result<RawValue, ExtractError> {
    let single = node.children().find(|c| is_named(c, "VALUE_COST"));
    let range = node.children().find(|c| is_named(c, "RANGE_VALUE_COST"));

    let amount = match (single, range) {
        (Some(single), None) => RawAmount::Single {
            value: node_text(single).map(str::to_string).into_iter().collect(),
        },
        (None, Some(range)) => RawAmount::Range {
            low_value: values(range, &[Step::Child("LOW_VALUE")]),
            high_value: values(range, &[Step::Child("HIGH_VALUE")]),
        },
        (None, None) => return Err(ExtractError::MissingValueShape { element: element_name(node) }),
        (Some(_), Some(_)) => return Err(ExtractError::AmbiguousValueShape { element: element_name(node) }),
    };

    Ok(RawValue {
        currencies: inherited_currency(node).map(str::to_string).into_iter().collect(),
        amount,
        vat_prct: values(node, VAT_PATH),
    })
}

/// Closest `CURRENCY` attribute on the node or one of its ancestors.
fn inherited_currency<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.ancestors().find_map(|n| n.attribute("CURRENCY"))
}

fn element_name(node: Node) -> String {
    node.tag_name().name().to_string()
}

/// Coerces a raw value block into a canonical record.
///
/// Returns `None` when the block cannot satisfy "currency plus at least one
/// amount"; the reason is pushed to `notes` under `field`.
pub fn normalize(raw: &RawValue, field: &str, notes: &mut Vec<Diagnostic>) -> Option<ValueRecord> {
    let mut currencies = raw.currencies.clone();
    currencies.dedup();
    let currency = match currencies.as_slice() {
        [] => {
            notes.push(Diagnostic::ValueDropped { field: field.to_string(), reason: "no currency".to_string() });
            return None;
        }
        [currency] => currency.clone(),
        _ => {
            tracing::warn!("Dropping {}: range currencies {:?} disagree", field, currencies);
            notes.push(Diagnostic::CurrencyMismatch { field: field.to_string(), currencies });
            return None;
        }
    };

    let mut coerce = |key: &str, texts: &[String]| -> Option<f64> {
        let raw_text = texts.first()?;
        match to_number(raw_text) {
            Ok(number) => Some(number),
            Err(err) => {
                tracing::warn!("{}.{}: {}", field, key, err);
                notes.push(Diagnostic::CoercionFailed { field: format!("{}.{}", field, key), raw: err.raw });
                None
            }
        }
    };

    let amount = match &raw.amount {
        RawAmount::Single { value } => coerce("VALUE", value).map(|value| Amount::Single { value }),
        RawAmount::Range { low_value, high_value } => {
            let low_value = coerce("LOW_VALUE", low_value);
            let high_value = coerce("HIGH_VALUE", high_value);
            (low_value.is_some() || high_value.is_some()).then_some(Amount::Range { low_value, high_value })
        }
    };
    let vat_prct = coerce("VAT_PRCT", &raw.vat_prct);

    match amount {
        Some(amount) => Some(ValueRecord { currency, amount, vat_prct }),
        None => {
            tracing::debug!("Dropping {}: no usable amount", field);
            notes.push(Diagnostic::ValueDropped { field: field.to_string(), reason: "no amount".to_string() });
            None
        }
    }
}

/// Inverse of [`normalize`]: renders a record back into raw text fields.
#[cfg(test)]
pub fn lift(record: &ValueRecord) -> RawValue {
    let text = |number: &Option<f64>| number.iter().map(|n| n.to_string()).collect::<Vec<_>>();
    let amount = match &record.amount {
        Amount::Single { value } => RawAmount::Single { value: vec![value.to_string()] },
        Amount::Range { low_value, high_value } => RawAmount::Range {
            low_value: text(low_value),
            high_value: text(high_value),
        },
    };
    RawValue { currencies: vec![record.currency.clone()], amount, vat_prct: text(&record.vat_prct) }
}
