//! Checkbridge GitHub infrastructure adapter.
//!
//! Executes the [`checks::Decision`]s produced by the reconciliation domain as
//! check-run REST calls, and reads existing check runs back as
//! [`checks::RunDetails`] so the domain can match against them.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain reconciliation rules.
//! URL layout, API headers, pagination and response decoding live here; the
//! [`checks`] crate never sees them. Authentication is delegated to an
//! [`InstallationHeaders`] implementation supplied by the binary.

mod auth;
mod client;
mod error;

pub use auth::{InstallationHeaders, StaticToken};
pub use client::{CheckRunClient, DEFAULT_API_URL};
pub use error::GithubError;
