//! Session token endpoints.
//!
//! - GET/POST `/validate` - Check the bearer token, report its subject
//! - POST `/refresh` - Exchange the bearer token for a new one
//! - OPTIONS on both - CORS preflight, independent of credentials

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use super::cors::preflight;
use super::error::{ApiError, ResultExt};
use crate::auth::BearerToken;
use crate::authority::{RefreshVerdict, TokenAuthority, Verdict};
use crate::rate_limit::{RateLimitConfig, rate_limit_refresh};

#[derive(Clone)]
pub struct SessionState {
    pub authority: TokenAuthority,
}

pub fn router(state: SessionState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let refresh_route = post(refresh_token)
        .options(preflight)
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_refresh));

    Router::new()
        .route(
            "/validate",
            get(validate_token).post(validate_token).options(preflight),
        )
        .route("/refresh", refresh_route)
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    valid: bool,
    subject_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    token: String,
    expires_at: i64,
    rotated: bool,
}

/// Report whether the presented token is currently valid.
async fn validate_token(
    State(state): State<SessionState>,
    bearer: BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    let verdict = state
        .authority
        .validate(bearer.as_deref())
        .await
        .store_err("Failed to validate token")?;

    match verdict {
        Verdict::Valid { subject_id } => Ok((
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                subject_id,
            }),
        )),
        Verdict::Invalid(rejection) => Err(ApiError::rejected(rejection)),
    }
}

/// Exchange the presented token for a new one.
async fn refresh_token(
    State(state): State<SessionState>,
    bearer: BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    let verdict = state
        .authority
        .refresh(bearer.as_deref())
        .await
        .store_err("Failed to refresh token")?;

    match verdict {
        RefreshVerdict::Issued(issued) => Ok((
            StatusCode::OK,
            Json(RefreshResponse {
                token: issued.token,
                expires_at: issued.expires_at,
                rotated: issued.rotated,
            }),
        )),
        RefreshVerdict::Rejected(rejection) => Err(ApiError::rejected(rejection)),
    }
}
