//! Account endpoints: registration, sign-in and password reset.

use axum::extract::{Path, State};
use carebase_records::{
    account::{ForgotPassword, Login, NewPassword},
    patient::Registration,
};

use crate::{
    api::{extractors::JsonBody, response::Envelope},
    request_context::RequestContext,
    state::AppState,
    Result,
};

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(registration): JsonBody<Registration>,
) -> Result<Envelope> {
    let summary = state.accounts.register(registration).await?;
    tracing::debug!(request_id = %ctx.request_id, patient_id = %summary.id, "Registration handled");

    Envelope::created()
        .message("Registration successful. Your medical record number has been sent to your email.")
        .data("user", summary)
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(login): JsonBody<Login>,
) -> Result<Envelope> {
    let session = state.accounts.login(login).await?;

    Envelope::ok()
        .data("token", session.token)?
        .data("expiresIn", session.expires_in)?
        .data("user", session.patient)
}

/// POST /api/logout
///
/// Sessions are stateless; the client discards its token.
pub async fn logout() -> Envelope {
    Envelope::ok().message("Logged out successfully")
}

/// POST /api/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ForgotPassword>,
) -> Result<Envelope> {
    state.accounts.forgot_password(request).await?;
    Ok(Envelope::ok().message("Password reset link sent to your email"))
}

/// POST /api/reset-password/:token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(request): JsonBody<NewPassword>,
) -> Result<Envelope> {
    state.accounts.reset_password(&token, request).await?;
    Ok(Envelope::ok().message("Password has been reset successfully"))
}
