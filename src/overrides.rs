//! Command-line overrides: `path.to.field=value` strings applied to a raw
//! configuration tree.

use crate::inject::{inject_value, InjectError};
use crate::navigate::{extract_type, PathError};
use crate::record::{FieldKind, RecordType, ScalarKind};
use crate::schema::GraphConfig;
use serde_json::{Number, Value};
use thiserror::Error;

/// Failure while applying one override string.
///
/// Carries the offending override verbatim, so diagnostics point at the
/// command-line argument rather than at an internal step.
#[derive(Debug, Error)]
#[error("can't parse override `{spec}`")]
pub struct OverrideError {
    pub spec: String,
    #[source]
    pub kind: OverrideErrorKind,
}

#[derive(Debug, Error)]
pub enum OverrideErrorKind {
    #[error("expected `path=value`")]
    MissingSeparator,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("`{text}` is not a valid integer")]
    InvalidInt { text: String },

    #[error("`{text}` is not a valid number")]
    InvalidFloat { text: String },

    #[error(transparent)]
    Inject(#[from] InjectError),
}

/// Apply `overrides` in order to a copy of `raw` and return the copy.
///
/// Each override is split on its last `=` into a dotted path and a textual
/// value; the value is coerced to the kind the schema declares at that
/// path, then injected. The first failing override aborts the whole call
/// and `raw` is never partially modified. Later overrides to the same path
/// win.
pub fn apply_overrides(raw: &Value, overrides: &[String]) -> Result<Value, OverrideError> {
    let schema = GraphConfig::record();
    let mut updated = raw.clone();
    for spec in overrides {
        updated = apply_one(&schema, &updated, spec).map_err(|kind| OverrideError {
            spec: spec.clone(),
            kind,
        })?;
    }
    Ok(updated)
}

fn apply_one(schema: &RecordType, raw: &Value, spec: &str) -> Result<Value, OverrideErrorKind> {
    // Split on the last `=`; the path side never legitimately contains one.
    let (key, text) = spec.rsplit_once('=').ok_or(OverrideErrorKind::MissingSeparator)?;
    let path: Vec<&str> = key.split('.').collect();
    let kind = extract_type(schema, &path)?;
    let value = coerce(&kind, text)?;
    Ok(inject_value(raw, &path, value)?)
}

/// Coerce the textual value to the kind the schema expects at the target.
///
/// Scalar lists split on `,` into strings; integer and float scalars are
/// parsed. Everything else passes through as text: strings and enum
/// variant names unchanged, and booleans too, whose spelling is judged by
/// the validator rather than here.
fn coerce(kind: &FieldKind, text: &str) -> Result<Value, OverrideErrorKind> {
    match kind {
        FieldKind::Optional(inner) => coerce(inner, text),
        FieldKind::ScalarList(_) => Ok(Value::Array(
            text.split(',').map(|part| Value::String(part.to_string())).collect(),
        )),
        FieldKind::Scalar(ScalarKind::Int) => {
            let parsed: i64 = text
                .trim()
                .parse()
                .map_err(|_| OverrideErrorKind::InvalidInt { text: text.to_string() })?;
            Ok(Value::Number(parsed.into()))
        }
        FieldKind::Scalar(ScalarKind::Float) => {
            let parsed: f64 = text
                .trim()
                .parse()
                .map_err(|_| OverrideErrorKind::InvalidFloat { text: text.to_string() })?;
            Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| OverrideErrorKind::InvalidFloat { text: text.to_string() })
        }
        _ => Ok(Value::String(text.to_string())),
    }
}
