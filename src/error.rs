//! Error types for schema construction and dispatch.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A required key is absent from an inbound mapping.
    #[error("required field '{0}' missing")]
    MissingField(&'static str),

    /// A key is present but its value has the wrong JSON type.
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    UnrecognizedShape(#[from] UnrecognizedShape),
}

/// The mapping does not match any known response shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnrecognizedShape {
    #[error("unknown multi-KPI type: {0}")]
    UnknownKpiType(String),

    #[error("cannot determine KPI response type from data structure")]
    Indeterminate,
}

impl SchemaError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
