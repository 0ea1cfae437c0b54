//! Token issuance and bearer authentication.
//!
//! Tokens are HS256 JWTs signed with `auth.jwt_secret`. Each carries a
//! purpose so a password-reset token cannot be used as a session and the
//! other way round.

use axum::{
    extract::State,
    http::{header, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AuthConfig, request_context::RequestContext, state::AppState, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Patient record id.
    pub sub: Uuid,
    pub mrn: String,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens minted in the same second differ.
    pub jti: Uuid,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            session_ttl: Duration::seconds(config.token_ttl_seconds as i64),
            reset_ttl: Duration::seconds(config.reset_token_ttl_seconds as i64),
        }
    }

    pub fn issue(&self, patient_id: Uuid, mrn: &str, purpose: TokenPurpose) -> Result<String> {
        let ttl = match purpose {
            TokenPurpose::Session => self.session_ttl,
            TokenPurpose::PasswordReset => self.reset_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: patient_id,
            mrn: mrn.to_string(),
            purpose,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    /// Decode and check signature, expiry and purpose.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).ok()?;
        (data.claims.purpose == purpose).then_some(data.claims)
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl.num_seconds()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// Require a valid session token when `auth.required` is set.
///
/// Applied to the patient and bed routers; account endpoints stay public.
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    if !state.config.auth.required || req.method() == axum::http::Method::OPTIONS {
        return next.run(req).await;
    }

    let request_id = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let Some(token) = bearer_token(req.headers()) else {
        tracing::debug!(request_id = %request_id, "Missing bearer token");
        return Error::Unauthorized("missing bearer token".to_string()).into_response();
    };

    match state.tokens.verify(token, TokenPurpose::Session) {
        Some(claims) => {
            tracing::debug!(request_id = %request_id, patient_id = %claims.sub, "Session accepted");
            next.run(req).await
        }
        None => {
            tracing::debug!(request_id = %request_id, "Rejected bearer token");
            Error::Unauthorized("invalid or expired token".to_string()).into_response()
        }
    }
}
