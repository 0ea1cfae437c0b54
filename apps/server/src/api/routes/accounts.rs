//! Account routes. Public even when bearer authentication is required.

use crate::api::handlers::accounts;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/forgot-password", post(accounts::forgot_password))
        .route("/reset-password/:token", post(accounts::reset_password))
}
