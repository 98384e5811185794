mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every mutating method is a single transaction. Methods that target a row
/// which must exist return `Error::NotFound`; plain lookups return `Option`.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, username: &str, now: DateTime<Utc>) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self, after_id: i64, limit: i32) -> Result<Vec<User>>;
    /// Marks the user deleted, soft-deletes their credentials and drops their
    /// session tokens. Returns false if no active user matched.
    fn soft_delete_user(&self, id: i64) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str, now: DateTime<Utc>) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Namespace operations
    /// Inserts the namespace and the creator's Admin membership together.
    fn create_namespace(
        &self,
        name: &str,
        description: Option<&str>,
        creator: i64,
        now: DateTime<Utc>,
    ) -> Result<Namespace>;
    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>>;
    fn list_namespaces(&self) -> Result<Vec<Namespace>>;
    fn list_member_namespaces(&self, user_id: i64) -> Result<Vec<MemberNamespace>>;
    /// A `None` description keeps the current one.
    fn update_namespace(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Namespace>;
    /// Marks the namespace and everything it owns deleted. Returns false if
    /// no active namespace matched.
    fn soft_delete_namespace(&self, id: i64) -> Result<bool>;

    // Membership operations
    /// Membership in an active namespace.
    fn get_membership(&self, user_id: i64, namespace_id: i64) -> Result<Option<Membership>>;
    /// Returns false, leaving the existing row untouched, if one exists.
    fn insert_membership(&self, membership: &Membership) -> Result<bool>;
    fn delete_membership(&self, user_id: i64, namespace_id: i64) -> Result<bool>;
    fn list_memberships(&self, namespace_id: i64) -> Result<Vec<Membership>>;

    // Key operations
    fn create_key(
        &self,
        namespace_id: i64,
        name: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyView>;
    fn add_revision(
        &self,
        namespace_id: i64,
        name: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyView>;
    fn revert_key(&self, namespace_id: i64, name: &str, revision_number: i64) -> Result<KeyView>;
    fn soft_delete_key(&self, namespace_id: i64, name: &str) -> Result<bool>;
    fn restore_key(&self, namespace_id: i64, name: &str) -> Result<bool>;
    fn get_active_key(&self, namespace_id: i64, name: &str) -> Result<Option<Key>>;
    fn get_key_view(&self, namespace_id: i64, name: &str) -> Result<Option<KeyView>>;
    fn list_key_views(&self, namespace_id: i64) -> Result<Vec<KeyView>>;
    /// Newest first.
    fn list_revisions(&self, key_id: i64) -> Result<Vec<Revision>>;
    fn get_revision(&self, key_id: i64, revision_number: i64) -> Result<Option<Revision>>;

    // Scoped credential operations
    fn create_credential(&self, credential: &NewCredential) -> Result<ScopedCredential>;
    fn get_credential(&self, id: i64) -> Result<Option<ScopedCredential>>;
    fn get_credential_by_hash(&self, secret_hash: &str) -> Result<Option<ScopedCredential>>;
    /// Non-deleted credentials of the user that have not expired at `now`.
    fn list_user_credentials(&self, user_id: i64, now: DateTime<Utc>)
    -> Result<Vec<ScopedCredential>>;
    fn revoke_credential(&self, id: i64) -> Result<bool>;

    // Retention
    fn retention_counts(&self, now: DateTime<Utc>) -> Result<RetentionCounts>;
    fn purge_deleted_keys(&self) -> Result<usize>;
    fn purge_deleted_namespaces(&self) -> Result<usize>;
    fn purge_deleted_users(&self) -> Result<UserPurge>;
    fn purge_dead_credentials(&self, now: DateTime<Utc>) -> Result<usize>;

    fn stats(&self) -> Result<StoreStats>;
}
