//! Domain services layered over the [`Store`](crate::store::Store).

pub mod access;
mod credentials;
mod keys;
mod namespaces;
mod sweeper;
mod users;
pub mod validation;

pub use access::{AccessGate, Decision, DenyReason, Resolution, parse_namespace_id};
pub use credentials::{CredentialIssuer, DEFAULT_TTL_DAYS, IssuedCredential, MAX_TTL_DAYS};
pub use keys::VersionedKeyStore;
pub use namespaces::NamespaceStore;
pub use sweeper::{RetentionSweeper, StepFailure, SweepReport, SweepScheduler, SweepStep};
pub use users::{Directory, IssuedToken};
