use std::sync::Arc;

use tracing::info;

use super::validation::{validate_namespace_description, validate_namespace_name};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{MemberNamespace, Membership, Namespace, Role};

/// Namespace lifecycle and membership management.
pub struct NamespaceStore {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl NamespaceStore {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a namespace; the creator becomes its Admin.
    pub fn create(&self, name: &str, description: Option<&str>, creator: i64) -> Result<Namespace> {
        validate_namespace_name(name)?;
        validate_namespace_description(description)?;

        let namespace = self
            .store
            .create_namespace(name, description, creator, self.clock.now())?;
        info!(
            namespace_id = namespace.id,
            creator, "created namespace '{}'", namespace.name
        );
        Ok(namespace)
    }

    pub fn get(&self, id: i64) -> Result<Namespace> {
        self.store
            .get_namespace(id)?
            .filter(|ns| !ns.deleted)
            .ok_or_else(|| Error::not_found("Namespace not found"))
    }

    pub fn list_for_subject(&self, subject_id: i64) -> Result<Vec<MemberNamespace>> {
        self.store.list_member_namespaces(subject_id)
    }

    /// The caller's namespaces called `name`. Names are only unique per
    /// creator, so a member of several teams may see more than one.
    pub fn find_for_subject(&self, subject_id: i64, name: &str) -> Result<Vec<MemberNamespace>> {
        let mut found = self.store.list_member_namespaces(subject_id)?;
        found.retain(|member| member.namespace.name == name);
        Ok(found)
    }

    pub fn rename(
        &self,
        id: i64,
        new_name: &str,
        new_description: Option<&str>,
    ) -> Result<Namespace> {
        validate_namespace_name(new_name)?;
        validate_namespace_description(new_description)?;

        let namespace = self.store.update_namespace(id, new_name, new_description)?;
        info!(namespace_id = id, "renamed namespace to '{}'", namespace.name);
        Ok(namespace)
    }

    /// Soft-deletes the namespace along with its keys and API keys.
    pub fn soft_delete(&self, id: i64) -> Result<()> {
        if !self.store.soft_delete_namespace(id)? {
            return Err(Error::not_found("Namespace not found"));
        }
        info!(namespace_id = id, "soft-deleted namespace");
        Ok(())
    }

    /// Grants `role` to `user_id`. An existing membership is left as it is.
    pub fn grant(&self, namespace_id: i64, user_id: i64, role: Role) -> Result<Membership> {
        self.get(namespace_id)?;
        self.store
            .get_user(user_id)?
            .filter(|user| !user.deleted)
            .ok_or_else(|| Error::not_found("User not found"))?;

        let inserted = self.store.insert_membership(&Membership {
            user_id,
            namespace_id,
            role,
            granted_at: self.clock.now(),
        })?;
        if inserted {
            info!(namespace_id, user_id, %role, "granted namespace role");
        }

        self.store
            .get_membership(user_id, namespace_id)?
            .ok_or_else(|| Error::not_found("Membership not found"))
    }

    /// Removes a membership. Admins cannot remove themselves, so a namespace
    /// is never orphaned by self-removal.
    pub fn revoke(&self, namespace_id: i64, user_id: i64, acting_subject: i64) -> Result<()> {
        let membership = self
            .store
            .get_membership(user_id, namespace_id)?
            .ok_or_else(|| Error::not_found("Membership not found"))?;

        if user_id == acting_subject && membership.role == Role::Admin {
            return Err(Error::forbidden(
                "You cannot revoke your own Admin membership",
            ));
        }

        if !self.store.delete_membership(user_id, namespace_id)? {
            return Err(Error::not_found("Membership not found"));
        }
        info!(namespace_id, user_id, "revoked namespace membership");
        Ok(())
    }

    pub fn members(&self, namespace_id: i64) -> Result<Vec<Membership>> {
        self.get(namespace_id)?;
        self.store.list_memberships(namespace_id)
    }
}
