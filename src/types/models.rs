use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Role;

#[derive(Debug, Clone, Serialize)]
pub struct Namespace {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    #[serde(skip)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A namespace as seen by one of its members.
#[derive(Debug, Clone, Serialize)]
pub struct MemberNamespace {
    #[serde(flatten)]
    pub namespace: Namespace,
    pub role: Role,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Session token used to authenticate users and operators.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub user_id: i64,
    pub namespace_id: i64,
    pub role: Role,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Key {
    pub id: i64,
    pub name: String,
    pub namespace_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_revision_id: Option<i64>,
    #[serde(skip)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A key joined with its current revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyView {
    pub id: i64,
    pub name: String,
    pub namespace_id: i64,
    pub current_value: Option<String>,
    pub current_revision_number: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub id: i64,
    pub key_id: i64,
    pub value: String,
    pub revision_number: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopedCredential {
    pub id: i64,
    pub user_id: i64,
    pub namespace_id: i64,
    #[serde(skip)]
    pub secret_hash: String,
    /// Masked form of the secret; the full secret is never stored.
    pub secret_preview: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub deleted: bool,
}

impl ScopedCredential {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Insert payload for a scoped credential.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub user_id: i64,
    pub namespace_id: i64,
    pub secret_hash: String,
    pub secret_preview: String,
    pub role: Role,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Rows currently waiting for the retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionCounts {
    pub keys: usize,
    pub namespaces: usize,
    pub users: usize,
    pub credentials: usize,
    pub expired_credentials: usize,
}

impl RetentionCounts {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of purging soft-deleted users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPurge {
    pub purged: usize,
    /// Users left in place because they still own an active namespace.
    pub skipped: Vec<i64>,
}

/// Row counts reported by `revlo admin info`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub namespaces: usize,
    pub keys: usize,
    pub revisions: usize,
    pub credentials: usize,
    pub tokens: usize,
}
