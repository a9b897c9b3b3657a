// HTTP middleware and extractors

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use relaytv_core::{
    models::Profile,
    service::{ActorContext, ClientInfo, Credentials},
};

use super::{AppError, AppState};

/// Authenticated subscriber resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub profile: Profile,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let credentials = bearer_credentials(&parts.headers)?;

        let profile = app_state.gate.authenticate(&credentials).await?;
        Ok(Self { profile })
    }
}

/// Authenticated operator. Rejects non-admin accounts with 403.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub profile: Profile,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { profile } = AuthUser::from_request_parts(parts, state).await?;

        if !profile.role.is_admin() {
            return Err(AppError::forbidden("Admin privileges required"));
        }
        Ok(Self { profile })
    }
}

/// Extract bearer credentials from the Authorization header.
pub fn bearer_credentials(headers: &HeaderMap) -> Result<Credentials, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|e| AppError::unauthorized(format!("Invalid Authorization header: {e}")))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Expected Bearer token"))?;

    Ok(Credentials::Bearer(token.to_string()))
}

/// Connection details pulled from proxy and client headers.
pub fn client_info_from_headers(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        client_ip: client_ip(headers),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
        device_info: None,
    }
}

/// Build the audit actor context for an operator request.
pub fn actor_context(profile: &Profile, headers: &HeaderMap) -> ActorContext {
    ActorContext {
        actor_id: profile.id.to_string(),
        actor_username: profile.username.clone(),
        ip_address: client_ip(headers),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .or_else(|| header_str(headers, "x-real-ip"))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        match bearer_credentials(&headers) {
            Ok(Credentials::Bearer(token)) => assert_eq!(token, "abc123"),
            other => panic!("expected bearer credentials, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_header_rejected() {
        let headers = HeaderMap::new();
        assert!(bearer_credentials(&headers).is_err());
    }

    #[test]
    fn test_basic_scheme_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwdw=="),
        );
        assert!(bearer_credentials(&headers).is_err());
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let info = client_info_from_headers(&headers);
        assert_eq!(info.client_ip.as_deref(), Some("203.0.113.9"));
    }
}
