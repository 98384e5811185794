use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::validation::validate_username;
use crate::auth::TokenGenerator;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Token, User};

const MAX_TOKEN_RETRIES: u32 = 3;

/// A freshly minted session token. `raw` is shown once and never stored.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub token: Token,
}

/// Subject provisioning, removal and session-token issuance.
pub struct Directory {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    generator: TokenGenerator,
}

impl Directory {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            generator: TokenGenerator::new(),
        }
    }

    pub fn create_user(&self, username: &str) -> Result<User> {
        validate_username(username)?;
        let user = self.store.create_user(username, self.clock.now())?;
        info!(user_id = user.id, "created user '{}'", user.username);
        Ok(user)
    }

    /// Active user by id.
    pub fn get_user(&self, id: i64) -> Result<User> {
        self.store
            .get_user(id)?
            .filter(|user| !user.deleted)
            .ok_or_else(|| Error::not_found("User not found"))
    }

    pub fn find_by_username(&self, username: &str) -> Result<User> {
        self.store
            .get_user_by_username(username)?
            .ok_or_else(|| Error::not_found(format!("User '{username}' not found")))
    }

    pub fn list_users(&self, after_id: i64, limit: i32) -> Result<Vec<User>> {
        self.store.list_users(after_id, limit)
    }

    /// Soft-deletes the user. Their API keys are revoked and session tokens
    /// dropped in the same transaction.
    pub fn soft_delete_user(&self, id: i64) -> Result<()> {
        if !self.store.soft_delete_user(id)? {
            return Err(Error::not_found("User not found"));
        }
        info!(user_id = id, "soft-deleted user");
        Ok(())
    }

    pub fn issue_session_token(&self, user_id: i64, expires_in: Option<Duration>) -> Result<IssuedToken> {
        if expires_in.is_some_and(|d| d <= Duration::zero()) {
            return Err(Error::bad_input("Token lifetime must be positive"));
        }
        self.get_user(user_id)?;

        let issued = self.mint(false, Some(user_id), expires_in)?;
        info!(user_id, token_id = %issued.token.id, "issued session token");
        Ok(issued)
    }

    pub fn create_admin_token(&self) -> Result<IssuedToken> {
        let issued = self.mint(true, None, None)?;
        info!(token_id = %issued.token.id, "issued admin token");
        Ok(issued)
    }

    pub fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        self.store.list_tokens(cursor, limit)
    }

    pub fn get_token(&self, id: &str) -> Result<Token> {
        self.store
            .get_token_by_id(id)?
            .ok_or_else(|| Error::not_found("Token not found"))
    }

    pub fn delete_token(&self, id: &str) -> Result<()> {
        if !self.store.delete_token(id)? {
            return Err(Error::not_found("Token not found"));
        }
        info!(token_id = id, "deleted token");
        Ok(())
    }

    fn mint(
        &self,
        is_admin: bool,
        user_id: Option<i64>,
        expires_in: Option<Duration>,
    ) -> Result<IssuedToken> {
        for attempt in 1..=MAX_TOKEN_RETRIES {
            let minted = self.generator.mint()?;
            let now = self.clock.now();
            let token = Token {
                id: Uuid::new_v4().to_string(),
                token_hash: minted.hash,
                token_lookup: minted.lookup,
                is_admin,
                user_id,
                created_at: now,
                expires_at: expires_in.map(|d| now + d),
                last_used_at: None,
            };

            match self.store.create_token(&token) {
                Ok(()) => {
                    return Ok(IssuedToken {
                        raw: minted.raw,
                        token,
                    });
                }
                Err(Error::TokenLookupCollision) => {
                    warn!(attempt, "token lookup collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Internal(
            "failed to create token after retries".to_string(),
        ))
    }
}
