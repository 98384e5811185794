use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::info;

use super::validation::validate_credential_description;
use crate::auth::credential::GeneratedSecret;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{NewCredential, Role, ScopedCredential};

pub const DEFAULT_TTL_DAYS: i64 = 14;
pub const MAX_TTL_DAYS: i64 = 30;

/// A credential as returned at issuance. `secret` is never available again.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub secret: String,
    #[serde(flatten)]
    pub credential: ScopedCredential,
}

/// Issues, lists and revokes namespace-scoped API keys.
pub struct CredentialIssuer {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl CredentialIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Issues a credential for `namespace_id` carrying `role`.
    ///
    /// The issuer must be a member of the namespace with a role at least as
    /// high as the one requested. The role is fixed at issuance.
    pub fn issue(
        &self,
        subject_id: i64,
        namespace_id: i64,
        role: Role,
        description: Option<&str>,
        ttl_days: Option<i64>,
    ) -> Result<IssuedCredential> {
        validate_credential_description(description)?;
        let ttl_days = ttl_days.unwrap_or(DEFAULT_TTL_DAYS);
        if !(1..=MAX_TTL_DAYS).contains(&ttl_days) {
            return Err(Error::bad_input(format!(
                "API key lifetime must be between 1 and {MAX_TTL_DAYS} days"
            )));
        }

        let membership = self
            .store
            .get_membership(subject_id, namespace_id)?
            .ok_or_else(|| Error::forbidden("You do not have access to this namespace"))?;
        if !Role::sufficient(membership.role, role) {
            return Err(Error::forbidden(format!(
                "Cannot issue a {role} API key with {} access",
                membership.role
            )));
        }

        let generated = GeneratedSecret::new();
        let now = self.clock.now();
        let credential = self.store.create_credential(&NewCredential {
            user_id: subject_id,
            namespace_id,
            secret_hash: generated.hash,
            secret_preview: generated.preview,
            role,
            description: description.map(str::to_string),
            created_at: now,
            expires_at: Some(now + Duration::days(ttl_days)),
        })?;

        info!(
            credential_id = credential.id,
            subject_id,
            namespace_id,
            %role,
            ttl_days,
            "issued API key"
        );
        Ok(IssuedCredential {
            secret: generated.secret,
            credential,
        })
    }

    /// Active, unexpired credentials of the subject, newest first.
    pub fn list(&self, subject_id: i64) -> Result<Vec<ScopedCredential>> {
        self.store.list_user_credentials(subject_id, self.clock.now())
    }

    pub fn revoke(&self, subject_id: i64, credential_id: i64) -> Result<()> {
        let credential = self
            .store
            .get_credential(credential_id)?
            .filter(|c| !c.deleted)
            .ok_or_else(|| Error::not_found("API key not found"))?;
        if credential.user_id != subject_id {
            return Err(Error::forbidden("You can only revoke your own API keys"));
        }

        if !self.store.revoke_credential(credential_id)? {
            return Err(Error::not_found("API key not found"));
        }
        info!(credential_id, subject_id, "revoked API key");
        Ok(())
    }
}
