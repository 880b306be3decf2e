//! Error types for the reconciliation domain.
//!
//! [`ReconcileError`] covers malformed input handed to the Reconciliation
//! Engine and violations of the create/update payload invariants. These are
//! surfaced to the caller of the entry point; nothing here is retried.

use thiserror::Error;

/// Errors produced while turning CI lifecycle state into a check-run decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The environment snapshot does not describe a Buildkite job.
    ///
    /// Both `CI` and `BUILDKITE` must be set to a true value.
    #[error("environment is not a Buildkite CI job (CI and BUILDKITE must both be true)")]
    NotACiEnvironment,

    /// A variable required by the environment snapshot is absent.
    #[error("missing environment variable: {0}")]
    MissingVariable(String),

    /// A variable is present but its value cannot be interpreted.
    #[error("invalid value for {name}: {value:?}")]
    InvalidVariable {
        /// Variable name.
        name: String,
        /// Raw value as read from the environment.
        value: String,
    },

    /// A repository URL could not be reduced to `owner/repo`.
    #[error("invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),

    /// An existing check run matched but carries no remote id, so it cannot
    /// be addressed by an update.
    #[error("existing check run for {0} has no id")]
    MissingRecordId(String),

    /// A create payload is missing `head_sha`/`head_branch` or carries an id.
    #[error("invalid create payload: {0}")]
    InvalidCreate(&'static str),
}
