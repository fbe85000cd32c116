//! # grafo-config: declarative configuration for graph embedding training
//!
//! The configuration core of the grafo trainer. A training run is
//! described by a nested, self-documenting schema: a global record holding
//! per-entity-type records (a string-keyed mapping) and per-relation-type
//! records (an ordered list), plus the scalar hyperparameters. This crate
//! owns everything between a user's configuration source and the
//! validated, immutable [`GraphConfig`] the trainer consumes:
//!
//! - **record**: the runtime schema model (field descriptors, record types)
//! - **schema**: the configuration schema, typed and declarative
//! - **navigate**: dotted-path type resolution against the schema
//! - **inject**: non-mutating value injection into raw trees
//! - **overrides**: `path.to.field=value` command-line overrides
//! - **validate**: raw-tree validation into [`GraphConfig`]
//! - **loader**: sandboxed loading of foreign configuration sources
//! - **cli**: the standalone utility surface
//!
//! # Example
//!
//! ```
//! use grafo_config::{apply_overrides, parse_config};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "entities": {"user": {"num_partitions": 1}},
//!     "relations": [{"name": "follows", "lhs": "user", "rhs": "user"}],
//!     "dimension": 100,
//!     "entity_path": "/data/entities",
//!     "edge_paths": ["/data/edges"],
//!     "checkpoint_path": "/data/model",
//! });
//! let raw = apply_overrides(&raw, &["relations.0.weight=2.5".to_string()])?;
//! let config = parse_config(&raw)?;
//! assert_eq!(config.relations[0].weight, 2.5);
//! assert_eq!(config.batch_size, 1000); // default
//! # Ok::<(), grafo_config::Error>(())
//! ```

pub mod cli;
pub mod error;
pub mod inject;
pub mod loader;
pub mod navigate;
pub mod overrides;
pub mod record;
pub mod schema;
pub mod validate;


pub use cli::{parse_args, query_value, render_value, Cli};
pub use error::{Error, Result};
pub use inject::{inject_value, InjectError};
pub use loader::{register_search_path, resolve_unit, search_path_snapshot, ConfigLoader, LoadError};
pub use navigate::{extract_type, PathError};
pub use overrides::{apply_overrides, OverrideError, OverrideErrorKind};
pub use record::{Constraint, FieldDescriptor, FieldKind, RecordType, ScalarKind};
pub use schema::{BucketOrder, EntityConfig, GraphConfig, RelationConfig};
pub use validate::{parse_config, SchemaValidationError, ValidationIssue};
