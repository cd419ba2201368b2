//! # Tessera
//!
//! `tessera` is a credential and bearer token service: it authenticates
//! users by password against an external data store, issues signed,
//! time-bounded bearer tokens, verifies tokens presented on later
//! requests, refreshes them, and revokes them on logout.
//!
//! ## Active token
//!
//! The external store is the service of record for user records and for
//! the single active token per user. A token is only valid while it is
//! byte-identical to the one the store currently holds for its user, so
//! a new login or refresh supersedes every earlier token, even ones that
//! have not expired yet.
//!
//! ## Signing secret
//!
//! Tokens are signed with a process-wide secret initialized once at
//! startup and immutable afterwards. Unless a secret is configured
//! explicitly, a random one is generated and every outstanding token
//! becomes unverifiable after a restart.

pub mod cli;
pub mod password;
pub mod store;
pub mod tessera;
pub mod token;
