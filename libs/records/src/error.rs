//! Error types for the record model

use thiserror::Error;

use crate::Collection;

pub type Result<T> = std::result::Result<T, RecordError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("{0} payload must be a JSON object")]
    NotAnObject(&'static str),

    #[error("Malformed {collection} entry: {message}")]
    Malformed {
        collection: Collection,
        message: String,
    },

    #[error("Invalid {context}: {message}")]
    Invalid {
        context: &'static str,
        message: String,
    },

    #[error("Invalid medical record number: {0}")]
    InvalidMedicalRecordNumber(String),

    #[error("Unknown bed status: {0}")]
    UnknownBedStatus(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl RecordError {
    pub(crate) fn invalid(context: &'static str, errors: validator::ValidationErrors) -> Self {
        Self::Invalid {
            context,
            message: describe_validation_errors(&errors),
        }
    }
}

/// Flatten validator output into `field: code` pairs, sorted for stable messages.
pub fn describe_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect_errors(String::new(), errors, &mut parts);
    parts.sort();
    parts.join(", ")
}

fn collect_errors(prefix: String, errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    match &error.message {
                        Some(message) => out.push(format!("{path}: {message}")),
                        None => out.push(format!("{path}: {}", error.code)),
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}
