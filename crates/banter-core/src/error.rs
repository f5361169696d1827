use banter_api::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("parse {0}")]
    Parse(String),
    #[error("unresolved reference {0}")]
    UnresolvedReference(String),
    #[error("transport {0}")]
    Transport(String),
    #[error("remote {0}")]
    Remote(String),
    #[error("validation {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("closed")]
    Closed,
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Validation(err.to_string())
    }
}
