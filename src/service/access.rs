use std::fmt;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, ScopedCredential};

/// A caller's standing in a namespace, before any role requirement is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Member(Role),
    NotAMember,
    CredentialExpired,
    CredentialRevoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientRole,
    NotAMember,
    CredentialExpired,
    CredentialRevoked,
}

impl DenyReason {
    /// Whether the presented credential itself is unusable, as opposed to
    /// the caller merely lacking access.
    #[must_use]
    pub fn is_credential_failure(self) -> bool {
        matches!(
            self,
            DenyReason::CredentialExpired | DenyReason::CredentialRevoked
        )
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            DenyReason::InsufficientRole => "Insufficient role for this operation",
            DenyReason::NotAMember => "You do not have access to this namespace",
            DenyReason::CredentialExpired => "API key has expired",
            DenyReason::CredentialRevoked => "API key has been revoked",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(Role),
    Forbidden(DenyReason),
}

/// Resolves and enforces a subject's role within a namespace.
pub struct AccessGate {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AccessGate {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Role from the membership table. Missing rows and deleted namespaces
    /// are `NotAMember`, not errors.
    pub fn resolve_membership(&self, subject_id: i64, namespace_id: i64) -> Result<Resolution> {
        Ok(self
            .store
            .get_membership(subject_id, namespace_id)?
            .map_or(Resolution::NotAMember, |m| Resolution::Member(m.role)))
    }

    /// Role embedded in a scoped credential. Revocation is reported ahead of
    /// expiry; the issuer's current membership is not consulted.
    #[must_use]
    pub fn resolve_credential(
        &self,
        credential: &ScopedCredential,
        namespace_id: i64,
    ) -> Resolution {
        if credential.deleted {
            return Resolution::CredentialRevoked;
        }
        if credential.is_expired(self.clock.now()) {
            return Resolution::CredentialExpired;
        }
        if credential.namespace_id != namespace_id {
            return Resolution::NotAMember;
        }
        Resolution::Member(credential.role)
    }

    #[must_use]
    pub fn enforce(resolution: Resolution, required: Role) -> Decision {
        match resolution {
            Resolution::Member(role) if Role::sufficient(role, required) => {
                Decision::Allowed(role)
            }
            Resolution::Member(_) => Decision::Forbidden(DenyReason::InsufficientRole),
            Resolution::NotAMember => Decision::Forbidden(DenyReason::NotAMember),
            Resolution::CredentialExpired => Decision::Forbidden(DenyReason::CredentialExpired),
            Resolution::CredentialRevoked => Decision::Forbidden(DenyReason::CredentialRevoked),
        }
    }

    /// Membership lookup followed by enforcement.
    pub fn check_membership(
        &self,
        subject_id: i64,
        namespace_id: i64,
        required: Role,
    ) -> Result<Decision> {
        let resolution = self.resolve_membership(subject_id, namespace_id)?;
        Ok(Self::enforce(resolution, required))
    }
}

/// Parses an externally supplied namespace id.
pub fn parse_namespace_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::bad_input(format!(
            "Invalid namespace id '{raw}': must be a positive integer"
        ))),
    }
}
