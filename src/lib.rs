//! # Revlo
//!
//! A multi-tenant versioned key-value store, usable both as a standalone
//! binary and as a library.
//!
//! Every write to a key is kept as an immutable revision. Keys live in
//! namespaces, and every operation is gated by the caller's role in the
//! namespace (`ReadOnly < Editor < Admin`), taken either from a session
//! token plus membership or from a namespace-scoped API key.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! revlo = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use revlo::clock::SystemClock;
//! use revlo::server::{AppState, create_router};
//! use revlo::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/revlo.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), Arc::new(SystemClock), true));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
