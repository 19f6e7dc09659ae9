//! Admin request guard.
//!
//! Real session management lives in the storefront; dispatch only needs to
//! know "is this the admin backend talking". A shared token in
//! `x-admin-token` stands in for that seam.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use tracing::warn;

use crate::{AppState, error::ApiError};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        warn!("ADMIN_TOKEN not configured, rejecting admin request");
        return Err(ApiError::Unauthorized);
    };

    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(expected) {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
