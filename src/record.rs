//! Runtime schema model: field descriptors and record types.
//!
//! The configuration schema is described as data, not only as struct
//! definitions: a `RecordType` is an ordered set of `FieldDescriptor`s,
//! each carrying a semantic type, an optional default, a constraint, and
//! help text. The same description drives dotted-path type resolution
//! (`navigate`), validation (`validate`), and help output, so the schema
//! stays inspectable at runtime.

use serde_json::Value;
use std::fmt;

/// Primitive value kinds a scalar field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarKind {
    /// Whether a raw value has this primitive shape.
    ///
    /// Integers are accepted where a float is expected, matching what
    /// configuration authors write (`hogwild_delay: 2`). The reverse does
    /// not hold: an integer field rejects fractional input.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ScalarKind::Bool => value.is_boolean(),
            ScalarKind::Int => value.is_i64() || value.is_u64(),
            ScalarKind::Float => value.is_number(),
            ScalarKind::Str => value.is_string(),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Bool => write!(f, "a boolean"),
            ScalarKind::Int => write!(f, "an integer"),
            ScalarKind::Float => write!(f, "a number"),
            ScalarKind::Str => write!(f, "a string"),
        }
    }
}

/// The semantic type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Closed set of string-valued variants.
    Enum(&'static [&'static str]),
    /// A nested record.
    Record(RecordType),
    /// String-keyed mapping of records, unordered and uniquely keyed.
    Map(RecordType),
    /// Ordered sequence of records; element identity is positional.
    List(RecordType),
    /// Sequence of scalars.
    ScalarList(ScalarKind),
    /// The value may be null; the inner kind applies otherwise.
    Optional(Box<FieldKind>),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(scalar) => scalar.fmt(f),
            FieldKind::Enum(variants) => write!(f, "one of {}", variants.join(", ")),
            FieldKind::Record(record) => write!(f, "a `{}` record", record.name),
            FieldKind::Map(record) => write!(f, "a mapping of `{}` records", record.name),
            FieldKind::List(record) => write!(f, "a list of `{}` records", record.name),
            FieldKind::ScalarList(scalar) => write!(f, "a list where each item is {scalar}"),
            FieldKind::Optional(inner) => write!(f, "{inner}, or null"),
        }
    }
}

/// Per-field validity predicate, applied after the shape check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    None,
    Positive,
    NonNegative,
    NonEmpty,
}

impl Constraint {
    /// Returns a violation message, or `None` if the value passes.
    ///
    /// Null always passes: optional fields apply their constraint only when
    /// a value is present.
    pub fn check(self, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        match self {
            Constraint::None => None,
            Constraint::Positive => match value.as_f64() {
                Some(number) if number > 0.0 => None,
                _ => Some(format!("must be positive, got {value}")),
            },
            Constraint::NonNegative => match value.as_f64() {
                Some(number) if number >= 0.0 => None,
                _ => Some(format!("must be non-negative, got {value}")),
            },
            Constraint::NonEmpty => {
                let empty = match value {
                    Value::String(text) => text.is_empty(),
                    Value::Array(items) => items.is_empty(),
                    Value::Object(entries) => entries.is_empty(),
                    _ => false,
                };
                if empty {
                    Some("must not be empty".to_string())
                } else {
                    None
                }
            }
        }
    }
}

/// Metadata for one field of a record type. Immutable once the schema is
/// defined.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// `None` marks the field required; optional fields with no natural
    /// default use `Some(Value::Null)`.
    pub default: Option<Value>,
    pub constraint: Constraint,
    pub help: &'static str,
}

impl FieldDescriptor {
    /// A required, unconstrained field.
    pub fn new(name: &'static str, kind: FieldKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            default: None,
            constraint: Constraint::None,
            help,
        }
    }

    /// Make the field optional, with `default` used when it is absent.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Attach a validity constraint.
    pub fn constrained(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A named, ordered set of field descriptors, unique by name. The name tag
/// identifies the record kind in diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl RecordType {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        debug_assert!(
            fields
                .iter()
                .enumerate()
                .all(|(i, field)| fields[..i].iter().all(|prior| prior.name != field.name)),
            "duplicate field name in record `{name}`"
        );
        Self { name, fields }
    }

    /// The fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Render the schema as plain-text help, one entry per field, nested
    /// records indented below the field that contains them.
    pub fn render_help(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        for field in &self.fields {
            let pad = "  ".repeat(indent);
            let presence = match &field.default {
                None => "required".to_string(),
                Some(Value::Null) => "default: unset".to_string(),
                Some(default) => format!("default: {default}"),
            };
            out.push_str(&format!(
                "{pad}{} ({}; {presence})\n{pad}    {}\n",
                field.name, field.kind, field.help
            ));
            match &field.kind {
                FieldKind::Record(record) | FieldKind::Map(record) | FieldKind::List(record) => {
                    record.render_into(out, indent + 1);
                }
                _ => {}
            }
        }
    }
}
