use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Namespace, Role, Token};

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceFilter {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNamespaceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub namespace_id: i64,
    pub role: Role,
    pub required: Role,
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
pub struct GrantMembershipRequest {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKeyRequest {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct KeyValueResponse {
    pub name: String,
    pub value: String,
    pub revision_number: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    pub role: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ttl_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NamespaceResponse {
    #[serde(flatten)]
    pub namespace: Namespace,
    pub role: Role,
}
