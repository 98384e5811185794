use std::sync::Arc;

use tracing::{debug, info};

use super::validation::{validate_key_name, validate_revision_number};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{KeyView, Revision};

/// Keys and their revision history within a namespace.
///
/// Every mutation is a single store transaction. Revision numbers grow from
/// the highest number ever written for the key, so history is never
/// rewritten by a revert.
pub struct VersionedKeyStore {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

fn key_not_found(name: &str) -> Error {
    Error::not_found(format!("Key '{name}' not found"))
}

impl VersionedKeyStore {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, namespace_id: i64, name: &str, value: &str) -> Result<KeyView> {
        validate_key_name(name)?;
        let view = self
            .store
            .create_key(namespace_id, name, value, self.clock.now())?;
        info!(namespace_id, key = name, "created key");
        Ok(view)
    }

    /// Writes `value` as a new revision and makes it current.
    pub fn add_revision(&self, namespace_id: i64, name: &str, value: &str) -> Result<KeyView> {
        let view = self
            .store
            .add_revision(namespace_id, name, value, self.clock.now())?;
        debug!(
            namespace_id,
            key = name,
            revision = view.current_revision_number,
            "added revision"
        );
        Ok(view)
    }

    /// Points the key back at an existing revision.
    pub fn revert(&self, namespace_id: i64, name: &str, revision_number: i64) -> Result<KeyView> {
        validate_revision_number(revision_number)?;
        let view = self.store.revert_key(namespace_id, name, revision_number)?;
        info!(namespace_id, key = name, revision_number, "reverted key");
        Ok(view)
    }

    pub fn soft_delete(&self, namespace_id: i64, name: &str) -> Result<bool> {
        let deleted = self.store.soft_delete_key(namespace_id, name)?;
        if deleted {
            info!(namespace_id, key = name, "soft-deleted key");
        }
        Ok(deleted)
    }

    pub fn restore(&self, namespace_id: i64, name: &str) -> Result<bool> {
        let restored = self.store.restore_key(namespace_id, name)?;
        if restored {
            info!(namespace_id, key = name, "restored key");
        }
        Ok(restored)
    }

    pub fn get(&self, namespace_id: i64, name: &str) -> Result<KeyView> {
        self.store
            .get_key_view(namespace_id, name)?
            .ok_or_else(|| key_not_found(name))
    }

    pub fn list(&self, namespace_id: i64) -> Result<Vec<KeyView>> {
        self.store.list_key_views(namespace_id)
    }

    /// Every revision of the key, newest first.
    pub fn history(&self, namespace_id: i64, name: &str) -> Result<Vec<Revision>> {
        let key = self
            .store
            .get_active_key(namespace_id, name)?
            .ok_or_else(|| key_not_found(name))?;
        self.store.list_revisions(key.id)
    }

    pub fn value_at(&self, namespace_id: i64, name: &str, revision_number: i64) -> Result<String> {
        validate_revision_number(revision_number)?;
        let key = self
            .store
            .get_active_key(namespace_id, name)?
            .ok_or_else(|| key_not_found(name))?;
        self.store
            .get_revision(key.id, revision_number)?
            .map(|revision| revision.value)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Revision {revision_number} not found for key '{name}'"
                ))
            })
    }
}
