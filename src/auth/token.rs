//! Session tokens.
//!
//! A session token reads `revlo_<lookup>_<secret>`: eight hex characters
//! that index the stored row, then twenty-four hex characters of secret.
//! Only the lookup and an Argon2id PHC hash of the whole token are stored.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

const TOKEN_PREFIX: &str = "revlo";
const LOOKUP_BYTES: usize = 4;
const SECRET_BYTES: usize = 12;

/// A freshly minted session token and the parts of it that get stored.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub raw: String,
    pub lookup: String,
    pub hash: String,
}

/// The two segments of a well-formed session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub lookup: &'a str,
    pub secret: &'a str,
}

/// Mints session tokens and checks them against stored hashes.
pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    /// Argon2id with the library's default cost (19 MiB, 2 passes, 1 lane).
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default()),
        }
    }

    pub fn mint(&self) -> Result<MintedToken> {
        let mut bytes = [0u8; LOOKUP_BYTES + SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let (lookup, secret) = bytes.split_at(LOOKUP_BYTES);

        let lookup = hex::encode(lookup);
        let raw = format!("{TOKEN_PREFIX}_{lookup}_{}", hex::encode(secret));
        let hash = self.hash(&raw)?;

        Ok(MintedToken { raw, lookup, hash })
    }

    fn hash(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Internal(format!("failed to hash token: {e}")))
    }

    /// Whether `raw` is the token `stored_hash` was made from.
    pub fn matches(&self, raw: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::Internal(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(raw.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("failed to verify token: {e}"))),
        }
    }
}

/// Splits a raw token into its lookup and secret without allocating.
pub fn parse_token(raw: &str) -> Result<TokenParts<'_>> {
    let (prefix, rest) = raw.split_once('_').ok_or(Error::InvalidTokenFormat)?;
    let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

    let well_formed = prefix == TOKEN_PREFIX
        && is_hex_of_len(lookup, LOOKUP_BYTES * 2)
        && is_hex_of_len(secret, SECRET_BYTES * 2);
    if !well_formed {
        return Err(Error::InvalidTokenFormat);
    }

    Ok(TokenParts { lookup, secret })
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}
