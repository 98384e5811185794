pub mod credential;
mod middleware;
mod token;
mod verifier;

pub use middleware::{
    API_KEY_HEADER, AuthError, Caller, RequireAdmin, RequireUser, authenticate_caller,
};
pub use token::{MintedToken, TokenGenerator, TokenParts, parse_token};
pub use verifier::{IdentityVerifier, Session, StoreIdentityVerifier, VerifyError};
