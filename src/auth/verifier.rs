use std::sync::Arc;

use super::credential::hash_secret;
use super::{TokenGenerator, parse_token};
use crate::clock::Clock;
use crate::store::Store;
use crate::types::{ScopedCredential, Token, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    InvalidToken,
    TokenExpired,
    InvalidCredential,
    InternalError,
}

/// A verified session token. Admin tokens carry no user.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Token,
    pub user: Option<User>,
}

/// Turns presented secrets into identities.
pub trait IdentityVerifier: Send + Sync {
    fn verify_bearer_token(&self, raw_token: &str) -> Result<Session, VerifyError>;

    /// Looks up the credential behind `secret` and its owner. Expiry and
    /// revocation are left to the access gate so it can report them.
    fn verify_credential_secret(
        &self,
        secret: &str,
    ) -> Result<(ScopedCredential, User), VerifyError>;
}

/// Verifies identities against the store.
pub struct StoreIdentityVerifier {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    generator: TokenGenerator,
}

impl StoreIdentityVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            generator: TokenGenerator::new(),
        }
    }

    fn active_user(&self, user_id: i64) -> Result<User, VerifyError> {
        self.store
            .get_user(user_id)
            .map_err(|_| VerifyError::InternalError)?
            .filter(|user| !user.deleted)
            .ok_or(VerifyError::InvalidToken)
    }
}

impl IdentityVerifier for StoreIdentityVerifier {
    fn verify_bearer_token(&self, raw_token: &str) -> Result<Session, VerifyError> {
        let parts = parse_token(raw_token).map_err(|_| VerifyError::InvalidToken)?;

        let token = self
            .store
            .get_token_by_lookup(parts.lookup)
            .map_err(|_| VerifyError::InternalError)?
            .ok_or(VerifyError::InvalidToken)?;

        if !self
            .generator
            .matches(raw_token, &token.token_hash)
            .map_err(|_| VerifyError::InternalError)?
        {
            return Err(VerifyError::InvalidToken);
        }

        let now = self.clock.now();
        if token.expires_at.is_some_and(|expires_at| expires_at < now) {
            return Err(VerifyError::TokenExpired);
        }

        let user = match token.user_id {
            Some(user_id) => Some(self.active_user(user_id)?),
            None => None,
        };

        if let Err(e) = self.store.update_token_last_used(&token.id, now) {
            tracing::warn!("Failed to update token last_used_at: {e}");
        }

        Ok(Session { token, user })
    }

    fn verify_credential_secret(
        &self,
        secret: &str,
    ) -> Result<(ScopedCredential, User), VerifyError> {
        let credential = self
            .store
            .get_credential_by_hash(&hash_secret(secret))
            .map_err(|_| VerifyError::InternalError)?
            .ok_or(VerifyError::InvalidCredential)?;

        let user = self
            .active_user(credential.user_id)
            .map_err(|e| match e {
                VerifyError::InvalidToken => VerifyError::InvalidCredential,
                other => other,
            })?;

        Ok((credential, user))
    }
}
