//! Per-request context injected by the request-id middleware.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Handlers can take the context directly. Outside the middleware stack
/// (unit tests, nested routers) a fresh id is generated instead.
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext {
                request_id: uuid::Uuid::new_v4().to_string(),
            }))
    }
}
