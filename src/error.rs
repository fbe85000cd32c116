//! Crate-level error aggregation.

use thiserror::Error;

/// Any failure from navigating, overriding, validating, or loading a
/// configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] crate::navigate::PathError),

    #[error(transparent)]
    Inject(#[from] crate::inject::InjectError),

    #[error(transparent)]
    Override(#[from] crate::overrides::OverrideError),

    #[error(transparent)]
    Validation(#[from] crate::validate::SchemaValidationError),

    #[error(transparent)]
    Load(#[from] crate::loader::LoadError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no parameter at `{0}` in the configuration")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, Error>;
