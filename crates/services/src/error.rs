use thiserror::Error;

use crate::dao::base::DaoError;

/// Failure taxonomy of every engine operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(format!("{} not found", what.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

impl From<DaoError> for ServiceError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ServiceError::NotFound("Resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ServiceError::Conflict(msg),
            DaoError::Mongo(e) => ServiceError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ServiceError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ServiceError::Internal(e.to_string()),
        }
    }
}
