//! Dotted-path type resolution against the schema.
//!
//! Resolution is purely schematic: it answers "what kind of value belongs
//! at this path" without ever touching a raw configuration, so overrides
//! can be typed before the value they target exists.

use crate::record::{FieldKind, RecordType};
use thiserror::Error;

/// Failure to resolve a dotted path against a record type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("`{record}` has no field named `{field}`")]
    UnknownField { record: &'static str, field: String },

    #[error("`{field}` is a scalar and cannot contain `{rest}`")]
    ScalarDescent { field: String, rest: String },

    #[error("empty path")]
    Empty,
}

/// Resolve the field kind expected at `path` below `record`.
///
/// A map or list field consumes one extra segment for the key or index;
/// the segment's content is not inspected, so a symbolic placeholder
/// resolves the same as a concrete key.
pub fn extract_type(record: &RecordType, path: &[&str]) -> Result<FieldKind, PathError> {
    let Some((first, rest)) = path.split_first() else {
        return Err(PathError::Empty);
    };
    let descriptor = record.field(first).ok_or_else(|| PathError::UnknownField {
        record: record.name,
        field: (*first).to_string(),
    })?;
    descend(&descriptor.kind, first, rest)
}

fn descend(kind: &FieldKind, field: &str, rest: &[&str]) -> Result<FieldKind, PathError> {
    let Some((next, tail)) = rest.split_first() else {
        return Ok(kind.clone());
    };
    match kind {
        FieldKind::Record(record) => extract_type(record, rest),
        FieldKind::Map(element) | FieldKind::List(element) => {
            // `next` names the key or index and is accepted as-is.
            if tail.is_empty() {
                Ok(FieldKind::Record(element.clone()))
            } else {
                extract_type(element, tail)
            }
        }
        FieldKind::ScalarList(scalar) => {
            if tail.is_empty() {
                Ok(FieldKind::Scalar(*scalar))
            } else {
                Err(PathError::ScalarDescent {
                    field: (*next).to_string(),
                    rest: tail.join("."),
                })
            }
        }
        FieldKind::Optional(inner) => descend(inner, field, rest),
        FieldKind::Scalar(_) | FieldKind::Enum(_) => Err(PathError::ScalarDescent {
            field: field.to_string(),
            rest: rest.join("."),
        }),
    }
}
