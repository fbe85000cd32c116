//! Validation of raw trees into the typed configuration.
//!
//! Validation walks the raw tree against the declarative schema depth
//! first, aggregating every problem found in one pass rather than stopping
//! at the first. Defaults are materialized along the way, so a raw tree
//! that passes is also complete; the normalized tree then deserializes
//! into `GraphConfig` and the cross-record invariants run last, once every
//! nested record has validated. Advisory conditions are surfaced as
//! `tracing` warnings and never affect the outcome.

use crate::record::{FieldKind, RecordType};
use crate::schema::GraphConfig;
use serde_json::{Map, Value};
use std::fmt;

/// One problem found while validating a raw configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field; empty for whole-config issues.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Aggregate of every issue found in a single validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invalid configuration ({} problems):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaValidationError {}

/// Validate `raw` against the configuration schema and produce the typed,
/// immutable `GraphConfig`.
///
/// Fails with a path-annotated [`SchemaValidationError`] when a required
/// field is missing, a value has the wrong shape, a constraint or enum
/// membership check fails, an unknown field is present, or a cross-record
/// invariant does not hold. Absent optional fields take their declared
/// defaults.
pub fn parse_config(raw: &Value) -> Result<GraphConfig, SchemaValidationError> {
    let schema = GraphConfig::record();
    let mut issues = Vec::new();
    let normalized = check_record(&schema, raw, "", &mut issues);
    if !issues.is_empty() {
        return Err(SchemaValidationError { issues });
    }
    let config: GraphConfig = serde_json::from_value(normalized).map_err(|err| {
        SchemaValidationError {
            issues: vec![ValidationIssue {
                path: String::new(),
                message: format!("normalized configuration did not deserialize: {err}"),
            }],
        }
    })?;
    check_invariants(&config, &mut issues);
    if !issues.is_empty() {
        return Err(SchemaValidationError { issues });
    }
    Ok(config)
}

fn issue(path: &str, message: String) -> ValidationIssue {
    ValidationIssue { path: path.to_string(), message }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(number) if number.is_f64() => "a number",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Check one record and return its normalized (default-filled) mapping.
fn check_record(
    record: &RecordType,
    raw: &Value,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Value {
    let Some(entries) = raw.as_object() else {
        issues.push(issue(
            prefix,
            format!("expected a `{}` mapping, got {}", record.name, shape_of(raw)),
        ));
        return Value::Null;
    };
    let mut normalized = Map::new();
    for descriptor in record.fields() {
        let path = join(prefix, descriptor.name);
        match entries.get(descriptor.name) {
            None => match &descriptor.default {
                Some(default) => {
                    normalized.insert(descriptor.name.to_string(), default.clone());
                }
                None => issues.push(issue(
                    &path,
                    format!("missing required field ({})", descriptor.kind),
                )),
            },
            Some(value) => {
                if let Some(checked) = check_kind(&descriptor.kind, value, &path, issues) {
                    if let Some(violation) = descriptor.constraint.check(&checked) {
                        issues.push(issue(&path, violation));
                    }
                    normalized.insert(descriptor.name.to_string(), checked);
                }
            }
        }
    }
    for key in entries.keys() {
        if record.field(key).is_none() {
            issues.push(issue(
                &join(prefix, key),
                format!("unknown field for a `{}` record", record.name),
            ));
        }
    }
    Value::Object(normalized)
}

/// Check one value against its declared kind; `None` when the shape is
/// wrong (an issue has been recorded).
fn check_kind(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    match kind {
        FieldKind::Optional(inner) => {
            if value.is_null() {
                Some(Value::Null)
            } else {
                check_kind(inner, value, path, issues)
            }
        }
        FieldKind::Scalar(scalar) => {
            if scalar.matches(value) {
                Some(value.clone())
            } else {
                issues.push(issue(path, format!("expected {scalar}, got {}", shape_of(value))));
                None
            }
        }
        FieldKind::Enum(variants) => match value.as_str() {
            Some(text) if variants.iter().any(|variant| *variant == text) => Some(value.clone()),
            Some(text) => {
                issues.push(issue(
                    path,
                    format!("`{text}` is not one of {}", variants.join(", ")),
                ));
                None
            }
            None => {
                issues.push(issue(
                    path,
                    format!(
                        "expected one of {}, got {}",
                        variants.join(", "),
                        shape_of(value)
                    ),
                ));
                None
            }
        },
        FieldKind::Record(record) => {
            let normalized = check_record(record, value, path, issues);
            (!normalized.is_null()).then_some(normalized)
        }
        FieldKind::Map(element) => {
            let Some(entries) = value.as_object() else {
                issues.push(issue(
                    path,
                    format!("expected a mapping of `{}` records, got {}", element.name, shape_of(value)),
                ));
                return None;
            };
            let mut normalized = Map::new();
            for (key, entry) in entries {
                let checked = check_record(element, entry, &join(path, key), issues);
                if !checked.is_null() {
                    normalized.insert(key.clone(), checked);
                }
            }
            Some(Value::Object(normalized))
        }
        FieldKind::List(element) => {
            let Some(items) = value.as_array() else {
                issues.push(issue(
                    path,
                    format!("expected a list of `{}` records, got {}", element.name, shape_of(value)),
                ));
                return None;
            };
            let mut normalized = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let checked = check_record(element, item, &format!("{path}.{index}"), issues);
                if !checked.is_null() {
                    normalized.push(checked);
                }
            }
            Some(Value::Array(normalized))
        }
        FieldKind::ScalarList(scalar) => {
            let Some(items) = value.as_array() else {
                issues.push(issue(
                    path,
                    format!("expected a list where each item is {scalar}, got {}", shape_of(value)),
                ));
                return None;
            };
            for (index, item) in items.iter().enumerate() {
                if !scalar.matches(item) {
                    issues.push(issue(
                        &format!("{path}.{index}"),
                        format!("expected {scalar}, got {}", shape_of(item)),
                    ));
                }
            }
            Some(value.clone())
        }
    }
}

/// Cross-record consistency checks, run after every nested record has
/// validated on its own.
fn check_invariants(config: &GraphConfig, issues: &mut Vec<ValidationIssue>) {
    for (index, relation) in config.relations.iter().enumerate() {
        if !config.entities.contains_key(&relation.lhs) {
            issues.push(issue(
                &format!("relations.{index}"),
                format!(
                    "relation `{}` has an unknown left-hand entity type `{}`",
                    relation.name, relation.lhs
                ),
            ));
        }
        if !config.entities.contains_key(&relation.rhs) {
            issues.push(issue(
                &format!("relations.{index}"),
                format!(
                    "relation `{}` has an unknown right-hand entity type `{}`",
                    relation.name, relation.rhs
                ),
            ));
        }
    }
    if config.dynamic_relations && config.relations.len() != 1 {
        issues.push(issue(
            "relations",
            "dynamic relation mode requires exactly one relation type".to_string(),
        ));
    }
    if config.disable_lhs_negs && config.disable_rhs_negs {
        issues.push(issue(
            "disable_lhs_negs",
            "negative sampling cannot be disabled on both sides".to_string(),
        ));
    }
    if config.loss_fn == "logistic" && config.comparator == "cos" {
        tracing::warn!("logistic loss with cosine comparator; check this is intended");
    }
    if config.background_io {
        tracing::warn!("`background_io` is deprecated and has no effect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BucketOrder;
    use serde_json::json;

    fn base_raw() -> Value {
        json!({
            "entities": {"user": {"num_partitions": 1}},
            "relations": [{"name": "follows", "lhs": "user", "rhs": "user"}],
            "dimension": 100,
            "entity_path": "/e",
            "edge_paths": ["/p"],
            "checkpoint_path": "/c",
        })
    }

    fn paths_of(err: &SchemaValidationError) -> Vec<&str> {
        err.issues.iter().map(|issue| issue.path.as_str()).collect()
    }

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config = parse_config(&base_raw()).unwrap();
        assert_eq!(config.dimension, 100);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.num_epochs, 1);
        assert_eq!(config.lr, 1e-2);
        assert_eq!(config.margin, 0.1);
        assert_eq!(config.bucket_order, BucketOrder::InsideOut);
        assert_eq!(config.comparator, "cos");
        assert_eq!(config.loss_fn, "ranking");
        assert_eq!(config.num_partition_servers, -1);
        assert!(config.max_norm.is_none());
        assert!(config.workers.is_none());
        assert!(!config.dynamic_relations);
        let relation = &config.relations[0];
        assert_eq!(relation.weight, 1.0);
        assert_eq!(relation.operator, "none");
        assert!(!relation.all_negs);
        let user = &config.entities["user"];
        assert_eq!(user.num_partitions, 1);
        assert!(!user.featurized);
        assert!(user.dimension.is_none());
    }

    #[test]
    fn test_missing_required_field_names_path() {
        let mut raw = base_raw();
        raw.as_object_mut().unwrap().remove("checkpoint_path");
        let err = parse_config(&raw).unwrap_err();
        assert!(paths_of(&err).contains(&"checkpoint_path"), "{err}");
    }

    #[test]
    fn test_missing_nested_required_field() {
        let mut raw = base_raw();
        raw["entities"]["user"] = json!({});
        let err = parse_config(&raw).unwrap_err();
        assert!(paths_of(&err).contains(&"entities.user.num_partitions"), "{err}");
    }

    #[test]
    fn test_wrong_shape() {
        let mut raw = base_raw();
        raw["dimension"] = json!("wide");
        let err = parse_config(&raw).unwrap_err();
        let found = err.issues.iter().find(|i| i.path == "dimension").unwrap();
        assert!(found.message.contains("expected an integer"), "{found}");
    }

    #[test]
    fn test_constraint_violation() {
        let mut raw = base_raw();
        raw["dimension"] = json!(0);
        let err = parse_config(&raw).unwrap_err();
        let found = err.issues.iter().find(|i| i.path == "dimension").unwrap();
        assert!(found.message.contains("positive"), "{found}");
    }

    #[test]
    fn test_enum_membership() {
        let mut raw = base_raw();
        raw["bucket_order"] = json!("sideways");
        let err = parse_config(&raw).unwrap_err();
        let found = err.issues.iter().find(|i| i.path == "bucket_order").unwrap();
        assert!(found.message.contains("inside_out"), "{found}");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut raw = base_raw();
        raw["dimensionality"] = json!(8);
        let err = parse_config(&raw).unwrap_err();
        assert!(paths_of(&err).contains(&"dimensionality"), "{err}");
    }

    #[test]
    fn test_multiple_issues_aggregate() {
        let mut raw = base_raw();
        raw["dimension"] = json!(0);
        raw["lr"] = json!(-1.0);
        raw.as_object_mut().unwrap().remove("entity_path");
        let err = parse_config(&raw).unwrap_err();
        assert!(err.issues.len() >= 3, "{err}");
    }

    #[test]
    fn test_empty_entities_rejected() {
        let mut raw = base_raw();
        raw["entities"] = json!({});
        raw["relations"] = json!([]);
        let err = parse_config(&raw).unwrap_err();
        let paths = paths_of(&err);
        assert!(paths.contains(&"entities"), "{err}");
        assert!(paths.contains(&"relations"), "{err}");
    }

    #[test]
    fn test_unknown_relation_endpoint() {
        let mut raw = base_raw();
        raw["relations"][0]["rhs"] = json!("movie");
        let err = parse_config(&raw).unwrap_err();
        let found = err.issues.iter().find(|i| i.path == "relations.0").unwrap();
        assert!(found.message.contains("movie"), "{found}");
    }

    #[test]
    fn test_dynamic_relations_needs_exactly_one() {
        let mut raw = base_raw();
        raw["dynamic_relations"] = json!(true);
        raw["relations"] = json!([
            {"name": "a", "lhs": "user", "rhs": "user"},
            {"name": "b", "lhs": "user", "rhs": "user"},
        ]);
        let err = parse_config(&raw).unwrap_err();
        assert!(paths_of(&err).contains(&"relations"), "{err}");

        let mut raw = base_raw();
        raw["dynamic_relations"] = json!(true);
        assert!(parse_config(&raw).is_ok());
    }

    #[test]
    fn test_mutually_exclusive_negative_flags() {
        let mut raw = base_raw();
        raw["disable_lhs_negs"] = json!(true);
        raw["disable_rhs_negs"] = json!(true);
        let err = parse_config(&raw).unwrap_err();
        assert!(err.issues.iter().any(|i| i.message.contains("both sides")), "{err}");

        let mut raw = base_raw();
        raw["disable_lhs_negs"] = json!(true);
        assert!(parse_config(&raw).is_ok());
    }

    #[test]
    fn test_questionable_loss_comparator_is_not_fatal() {
        let mut raw = base_raw();
        raw["loss_fn"] = json!("logistic");
        // comparator defaults to cos; only a warning is emitted.
        assert!(parse_config(&raw).is_ok());
    }

    #[test]
    fn test_integer_accepted_for_float_field() {
        let mut raw = base_raw();
        raw["hogwild_delay"] = json!(3);
        let config = parse_config(&raw).unwrap();
        assert_eq!(config.hogwild_delay, 3.0);
    }

    #[test]
    fn test_boolean_text_is_rejected() {
        let mut raw = base_raw();
        raw["global_emb"] = json!("false");
        let err = parse_config(&raw).unwrap_err();
        let found = err.issues.iter().find(|i| i.path == "global_emb").unwrap();
        assert!(found.message.contains("expected a boolean"), "{found}");
    }

    #[test]
    fn test_optional_field_accepts_null_and_value() {
        let mut raw = base_raw();
        raw["max_norm"] = json!(null);
        assert!(parse_config(&raw).unwrap().max_norm.is_none());

        let mut raw = base_raw();
        raw["max_norm"] = json!(0.5);
        assert_eq!(parse_config(&raw).unwrap().max_norm, Some(0.5));

        let mut raw = base_raw();
        raw["max_norm"] = json!(-0.5);
        assert!(parse_config(&raw).is_err());
    }

    #[test]
    fn test_validated_config_mirrors_raw() {
        let mut raw = base_raw();
        raw["num_epochs"] = json!(7);
        raw["eval_fraction"] = json!(0.25);
        raw["entities"]["user"]["featurized"] = json!(true);
        let config = parse_config(&raw).unwrap();
        assert_eq!(config.num_epochs, 7);
        assert_eq!(config.eval_fraction, 0.25);
        assert!(config.entities["user"].featurized);
        assert_eq!(config.entity_path, "/e");
        assert_eq!(config.edge_paths, vec!["/p".to_string()]);
    }
}
