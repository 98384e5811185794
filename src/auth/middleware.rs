use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::verifier::{Session, VerifyError};
use crate::server::AppState;
use crate::types::{ScopedCredential, Token, User};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that requires admin authentication
pub struct RequireAdmin(pub Token);

/// Extractor that requires a user session token
pub struct RequireUser {
    pub token: Token,
    pub user: User,
}

/// Who is making a namespace-scoped request.
#[derive(Debug, Clone)]
pub enum Caller {
    Session { token: Token, user: User },
    Credential { credential: ScopedCredential, user: User },
}

impl Caller {
    #[must_use]
    pub fn user(&self) -> &User {
        match self {
            Caller::Session { user, .. } | Caller::Credential { user, .. } => user,
        }
    }

    #[must_use]
    pub fn subject_id(&self) -> i64 {
        self.user().id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InvalidApiKey,
    NotAdmin,
    NotUser,
    SessionRequired,
    InternalError,
}

impl From<VerifyError> for AuthError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::InvalidToken => AuthError::InvalidToken,
            VerifyError::TokenExpired => AuthError::TokenExpired,
            VerifyError::InvalidCredential => AuthError::InvalidApiKey,
            VerifyError::InternalError => AuthError::InternalError,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Invalid API key"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::NotUser => (
                StatusCode::FORBIDDEN,
                "User token required for this operation",
            ),
            AuthError::SessionRequired => (
                StatusCode::FORBIDDEN,
                "API keys cannot be used for this operation",
            ),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Bearer realm=\"revlo\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_headers(&parts.headers, state)?;

        if !session.token.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(session.token))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_headers(&parts.headers, state)?;

        if session.token.is_admin {
            return Err(AuthError::NotUser);
        }

        let user = session.user.ok_or(AuthError::NotUser)?;

        Ok(RequireUser {
            token: session.token,
            user,
        })
    }
}

/// Authenticates a namespace-scoped request from either a user session
/// token or an API key.
pub fn authenticate_caller(headers: &HeaderMap, state: &AppState) -> Result<Caller, AuthError> {
    if headers.contains_key(AUTHORIZATION) {
        let session = session_from_headers(headers, state)?;
        if session.token.is_admin {
            return Err(AuthError::NotUser);
        }
        let user = session.user.ok_or(AuthError::NotUser)?;
        return Ok(Caller::Session {
            token: session.token,
            user,
        });
    }

    let secret = api_key_from_headers(headers)?.ok_or(AuthError::MissingAuth)?;
    let (credential, user) = state.verifier.verify_credential_secret(&secret)?;
    Ok(Caller::Credential { credential, user })
}

fn session_from_headers(headers: &HeaderMap, state: &AppState) -> Result<Session, AuthError> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());

    let raw_token = match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidScheme)?,
        None if headers.contains_key(API_KEY_HEADER) => return Err(AuthError::SessionRequired),
        None => return Err(AuthError::MissingAuth),
    };

    Ok(state.verifier.verify_bearer_token(raw_token.trim())?)
}

fn api_key_from_headers(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    match headers.get(API_KEY_HEADER) {
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim().to_string()))
            .map_err(|_| AuthError::InvalidApiKey),
        None => Ok(None),
    }
}
