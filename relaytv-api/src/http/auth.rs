//! Authentication HTTP handlers

use axum::{extract::State, Json};
use relaytv_core::service::Credentials;
use serde::{Deserialize, Serialize};

use super::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
}

/// Exchange a username/password pair for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let credentials = Credentials::Password {
        username: req.username,
        password: req.password,
    };

    let profile = state.gate.authenticate(&credentials).await?;
    let token = state.tokens.issue(&profile)?;

    Ok(Json(LoginResponse {
        token,
        username: profile.username,
        role: profile.role.to_string(),
    }))
}
