use thiserror::Error;

use crate::fields::FieldValueType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("data encryption key not found for alias {alias}")]
    KeyNotFound { alias: String },
    #[error("key vault document for alias {alias} has no usable key id")]
    MalformedKeyDocument { alias: String },
    #[error("field path must not be empty")]
    EmptyFieldPath,
    #[error("duplicate encrypted field path: {path}")]
    DuplicateFieldPath { path: String },
    #[error("equality queries are not supported on {value_type} field {path}")]
    UnqueryableFieldType {
        path: String,
        value_type: FieldValueType,
    },
    #[error("missing environment variables: {}", .names.join(", "))]
    MissingCredentials { names: Vec<&'static str> },
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}
