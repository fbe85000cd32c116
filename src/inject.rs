//! Non-mutating injection of values into raw configuration trees.

use serde_json::{Map, Value};
use thiserror::Error;

/// Failure to set a value at a dotted path inside a raw tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("empty path")]
    Empty,

    #[error("cannot descend into scalar value at `{path}`")]
    NotAContainer { path: String },

    #[error("`{segment}` is not a valid sequence index")]
    InvalidIndex { segment: String },

    #[error("index {index} is out of range for the sequence at `{path}` (length {len})")]
    IndexOutOfRange { index: usize, path: String, len: usize },
}

/// Set `value` at `path` inside a copy of `raw` and return the copy.
///
/// Intermediate mapping segments that are absent (or null) are created as
/// empty mappings. Sequences are never created implicitly: an index
/// segment must name an existing element, since a sequence has no
/// canonical default length or order. The input is left untouched, on
/// failure as well as on success.
pub fn inject_value(raw: &Value, path: &[&str], value: Value) -> Result<Value, InjectError> {
    if path.is_empty() {
        return Err(InjectError::Empty);
    }
    let mut updated = raw.clone();
    set_at(&mut updated, path, 0, value)?;
    Ok(updated)
}

fn set_at(current: &mut Value, path: &[&str], depth: usize, value: Value) -> Result<(), InjectError> {
    let Some(segment) = path.get(depth) else {
        return Err(InjectError::Empty);
    };
    let is_leaf = depth + 1 == path.len();
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(entries) => {
            let slot = entries.entry((*segment).to_string()).or_insert(Value::Null);
            if is_leaf {
                *slot = value;
                Ok(())
            } else {
                set_at(slot, path, depth + 1, value)
            }
        }
        Value::Array(items) => {
            let index: usize = segment.parse().map_err(|_| InjectError::InvalidIndex {
                segment: (*segment).to_string(),
            })?;
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| InjectError::IndexOutOfRange {
                index,
                path: walked(path, depth),
                len,
            })?;
            if is_leaf {
                *slot = value;
                Ok(())
            } else {
                set_at(slot, path, depth + 1, value)
            }
        }
        _ => Err(InjectError::NotAContainer { path: walked(path, depth) }),
    }
}

fn walked(path: &[&str], depth: usize) -> String {
    if depth == 0 {
        "<root>".to_string()
    } else {
        path[..depth].join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_existing_leaf() {
        let raw = json!({"dimension": 100});
        let updated = inject_value(&raw, &["dimension"], json!(400)).unwrap();
        assert_eq!(updated, json!({"dimension": 400}));
        // The input is untouched.
        assert_eq!(raw, json!({"dimension": 100}));
    }

    #[test]
    fn test_creates_intermediate_mappings() {
        let raw = json!({});
        let updated = inject_value(&raw, &["a", "b", "c"], json!(1)).unwrap();
        assert_eq!(updated, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_null_intermediate_becomes_mapping() {
        let raw = json!({"a": null});
        let updated = inject_value(&raw, &["a", "b"], json!(2)).unwrap();
        assert_eq!(updated, json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_sequence_element_must_exist() {
        let raw = json!({"relations": [{"weight": 1.0}]});
        let updated = inject_value(&raw, &["relations", "0", "weight"], json!(2.5)).unwrap();
        assert_eq!(updated, json!({"relations": [{"weight": 2.5}]}));

        let err = inject_value(&raw, &["relations", "1", "weight"], json!(2.5)).unwrap_err();
        assert_eq!(
            err,
            InjectError::IndexOutOfRange { index: 1, path: "relations".to_string(), len: 1 }
        );
    }

    #[test]
    fn test_sequences_are_not_created() {
        let raw = json!({});
        // An absent segment becomes a mapping, so a numeric segment below
        // it is a mapping key, not an index.
        let updated = inject_value(&raw, &["relations", "0"], json!("x")).unwrap();
        assert_eq!(updated, json!({"relations": {"0": "x"}}));
    }

    #[test]
    fn test_bad_index() {
        let raw = json!({"relations": []});
        let err = inject_value(&raw, &["relations", "first"], json!(1)).unwrap_err();
        assert_eq!(err, InjectError::InvalidIndex { segment: "first".to_string() });
    }

    #[test]
    fn test_cannot_descend_into_scalar() {
        let raw = json!({"dimension": 100});
        let err = inject_value(&raw, &["dimension", "deep"], json!(1)).unwrap_err();
        assert_eq!(err, InjectError::NotAContainer { path: "dimension".to_string() });
        // Failure leaves the input usable.
        assert_eq!(raw, json!({"dimension": 100}));
    }

    #[test]
    fn test_leaf_overwrites_container() {
        let raw = json!({"entities": {"user": {"num_partitions": 1}}});
        let updated = inject_value(&raw, &["entities"], json!("gone")).unwrap();
        assert_eq!(updated, json!({"entities": "gone"}));
    }

    #[test]
    fn test_empty_path() {
        assert_eq!(inject_value(&json!({}), &[], json!(1)), Err(InjectError::Empty));
    }
}
