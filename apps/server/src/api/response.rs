//! Success envelope: `{"success": true, "message"?: ..., <key>: <data>}`.
//!
//! Failures use the same shape with `success: false`, see
//! [`Error`](crate::Error)'s `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{Error, Result};

#[derive(Debug)]
pub struct Envelope {
    status: StatusCode,
    body: Map<String, JsonValue>,
}

impl Envelope {
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    pub fn created() -> Self {
        Self::with_status(StatusCode::CREATED)
    }

    fn with_status(status: StatusCode) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), JsonValue::Bool(true));
        Self { status, body }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.body
            .insert("message".to_string(), JsonValue::String(message.into()));
        self
    }

    pub fn data(mut self, key: &str, data: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(data)
            .map_err(|e| Error::Internal(format!("failed to serialize response: {e}")))?;
        self.body.insert(key.to_string(), value);
        Ok(self)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(JsonValue::Object(self.body))).into_response()
    }
}
