//! Error types for the patient record server

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use carebase_records::RecordError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Store-level uniqueness constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Email,
    MedicalRecordNumber,
    BedNumber,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Duplicate value for unique key {0:?}")]
    Duplicate(UniqueKey),

    #[error("Invalid medical record number or password")]
    InvalidCredentials,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) | Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::InvalidCredentials | Error::InvalidResetToken | Error::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Database(_)
            | Error::Migration(_)
            | Error::Mail(_)
            | Error::Internal(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RecordError> for Error {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Serialization(message) => Error::Internal(message),
            other => Error::Validation(other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::Duplicate(UniqueKey::Email) => {
                "A patient with this email already exists".to_string()
            }
            Error::Duplicate(UniqueKey::BedNumber) => "Bed number already exists".to_string(),
            Error::Duplicate(UniqueKey::MedicalRecordNumber) => {
                "Medical record number already exists".to_string()
            }
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Internal error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        let mut response = (status, body).into_response();
        if matches!(self, Error::Unauthorized(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
