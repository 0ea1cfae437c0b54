//! Custom Axum extractors for JSON payloads and path identifiers.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::Error;

/// JSON body extractor whose rejections use the API's error envelope.
///
/// Unlike `axum::Json` it does not insist on a `content-type` header; the
/// body is parsed as JSON whatever the client declared.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::Validation(format!("Failed to read request body: {e}")))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Validation("Request body is required".to_string()));
        }

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| Error::Validation(format!("Invalid JSON body: {e}")))
    }
}

/// Parse an identifier taken from the path. Something that is not a UUID
/// cannot name an existing record, so it is reported as not found.
pub fn parse_id(raw: &str, what: &str) -> crate::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::not_found(what))
}
