//! Reconciliation domain for Checkbridge.
//!
//! Turns Buildkite job lifecycle state into create-or-update decisions for
//! GitHub check runs. Infrastructure crates decode webhooks into the records
//! defined here and execute the resulting [`Decision`]s; this crate never
//! performs I/O beyond reading the clock.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers and `owner/repo` parsing |
//! | [`types`] | Check-run vocabulary (`Status`, `Conclusion`, `RunDetails`, `Timestamp`) |
//! | [`buildkite`] | Job webhook records and the job environment snapshot |
//! | [`lifecycle`] | Job state → status/conclusion mapping |
//! | [`reconcile`] | Create-or-update decisions and their HTTP requests |
//! | [`errors`] | [`ReconcileError`] |

pub mod buildkite;
pub mod errors;
pub mod identifiers;
pub mod lifecycle;
pub mod reconcile;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use buildkite::{Build, Job, JobEnvironment, JobEvent, JobHook, JobState, Pipeline};
pub use errors::ReconcileError;
pub use identifiers::{BranchName, CheckRunId, CommitSha, ExternalId, RepositoryName};
pub use lifecycle::{
    conclusion_for, run_details_from_environment, run_details_from_environment_at,
    run_details_from_job, status_for,
};
pub use reconcile::{
    environment_to_decision, environment_to_decision_at, job_hook_to_decision, CheckRunRequest,
    Decision, RequestMethod,
};
pub use types::{Conclusion, Output, RunDetails, Status, Timestamp};
