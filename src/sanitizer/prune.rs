// src/sanitizer/prune.rs
use serde_json::Value;

/// Removes empty branches from a JSON tree, bottom-up.
///
/// A mapping entry is deleted when its value is null, `false`, an empty string,
/// an empty array or an empty object, after its own children were pruned.
/// Numbers are never pruned: a zero amount is data, not an empty field. Array elements are pruned inside but
/// not removed, so positions are preserved.
pub fn prune(node: &mut Value) {
    match node {
        Value::Object(map) => {
            for child in map.values_mut() {
                prune(child);
            }
            map.retain(|_, child| !is_empty(child));
        }
        Value::Array(items) => items.iter_mut().for_each(prune),
        _ => {}
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(_) => false,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
