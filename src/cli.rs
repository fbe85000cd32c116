//! Command-line surface for the standalone configuration utility.
//!
//! # Usage
//!
//! ```bash
//! grafo-config config.yaml dimension
//! grafo-config config.yaml relations.0.weight -p relations.0.weight=2.5
//! grafo-config config.yaml edge_paths -p edge_paths=/a,/b -p lr=0.02
//! ```

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

/// Load a configuration, apply overrides, validate, print one value.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "grafo-config")]
#[command(version)]
#[command(about = "Load, override and validate a graph embedding training configuration")]
pub struct Cli {
    /// Path to the configuration source file.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Dotted path of the parameter to print after loading.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Configuration overrides, `path.to.field=value`; repeatable.
    #[arg(short = 'p', long = "param", value_name = "OVERRIDE", num_args = 1..)]
    pub param: Vec<String>,
}

/// Parse CLI arguments from a string slice (for testing).
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Look up a dotted path inside a serialized configuration view.
pub fn query_value<'a>(view: &'a Value, query: &str) -> Option<&'a Value> {
    let mut current = view;
    for segment in query.split('.') {
        current = match current {
            Value::Object(entries) => entries.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Render a queried value the way a shell user expects: strings bare,
/// everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
