//! Buildkite-side records: job webhook payloads and the job environment.
//!
//! Webhook records decode with `serde`; unknown keys are ignored and missing
//! required keys fail. Buildkite sends many more fields than are listed here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ReconcileError, Timestamp};

// ---------------------------------------------------------------------------
// Lifecycle state
// ---------------------------------------------------------------------------

/// Lifecycle state of a Buildkite job or build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Scheduled,
    Running,
    Passed,
    Failed,
    Blocked,
    Canceled,
    Canceling,
    Skipped,
    NotRun,
}

impl JobState {
    /// Every state, in declaration order.
    pub const ALL: [JobState; 9] = [
        JobState::Scheduled,
        JobState::Running,
        JobState::Passed,
        JobState::Failed,
        JobState::Blocked,
        JobState::Canceled,
        JobState::Canceling,
        JobState::Skipped,
        JobState::NotRun,
    ];
}

/// Job webhook event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobEvent {
    #[serde(rename = "job.scheduled")]
    Scheduled,
    #[serde(rename = "job.activated")]
    Activated,
    #[serde(rename = "job.started")]
    Started,
    #[serde(rename = "job.finished")]
    Finished,
}

impl JobEvent {
    /// Every job event, in the order Buildkite emits them.
    pub const ALL: [JobEvent; 4] = [
        JobEvent::Scheduled,
        JobEvent::Activated,
        JobEvent::Started,
        JobEvent::Finished,
    ];

    /// The event name as it appears in the `X-Buildkite-Event` header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "job.scheduled",
            Self::Activated => "job.activated",
            Self::Started => "job.started",
            Self::Finished => "job.finished",
        }
    }
}

// ---------------------------------------------------------------------------
// Webhook records
// ---------------------------------------------------------------------------

/// A single job within a build.
///
/// Timestamps are kept as the raw strings Buildkite sent; see
/// [`Timestamp::parse`] for the accepted forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub state: JobState,
    pub build_url: String,
    pub web_url: String,
    pub log_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: String,
    pub message: String,
    pub state: JobState,
    pub url: String,
    pub web_url: String,
    pub commit: String,
    pub branch: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub url: String,
    pub web_url: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub slug: String,
    /// Git remote URL of the repository the pipeline builds.
    pub repository: String,
}

/// Body of a `job.*` webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHook {
    pub event: JobEvent,
    pub job: Job,
    pub build: Build,
    pub pipeline: Pipeline,
}

// ---------------------------------------------------------------------------
// Job environment
// ---------------------------------------------------------------------------

/// Snapshot of the environment variables the Buildkite agent sets for a job.
///
/// Read once; the command exit status only exists in post-command hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEnvironment {
    pub ci: bool,
    pub buildkite: bool,
    pub label: String,
    pub commit: String,
    pub branch: String,
    pub repo: String,
    pub build_url: String,
    pub job_id: String,
    pub command_exit_status: Option<i32>,
    pub timeout: bool,
}

impl JobEnvironment {
    /// Decodes a snapshot from `(name, value)` pairs, ignoring unknown names.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::MissingVariable`] if a required variable is absent.
    /// - [`ReconcileError::InvalidVariable`] if the exit status is not an
    ///   integer.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ReconcileError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut required = |name: &str| {
            vars.remove(name)
                .ok_or_else(|| ReconcileError::MissingVariable(name.to_string()))
        };

        let label = required("BUILDKITE_LABEL")?;
        let commit = required("BUILDKITE_COMMIT")?;
        let branch = required("BUILDKITE_BRANCH")?;
        let repo = required("BUILDKITE_REPO")?;
        let build_url = required("BUILDKITE_BUILD_URL")?;
        let job_id = required("BUILDKITE_JOB_ID")?;

        let command_exit_status = match vars.get("BUILDKITE_COMMAND_EXIT_STATUS") {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().parse::<i32>().map_err(|_| {
                ReconcileError::InvalidVariable {
                    name: "BUILDKITE_COMMAND_EXIT_STATUS".to_string(),
                    value: raw.clone(),
                }
            })?),
        };

        Ok(Self {
            ci: vars.get("CI").is_some_and(|v| is_truthy(v)),
            buildkite: vars.get("BUILDKITE").is_some_and(|v| is_truthy(v)),
            label,
            commit,
            branch,
            repo,
            build_url,
            job_id,
            command_exit_status,
            timeout: vars
                .get("BUILDKITE_TIMEOUT")
                .is_some_and(|v| timeout_flag_set(v)),
        })
    }

    /// Decodes a snapshot from the current process environment.
    pub fn from_process_env() -> Result<Self, ReconcileError> {
        Self::from_vars(std::env::vars())
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn timeout_flag_set(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Parses an optional raw Buildkite timestamp, dropping unparseable values.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<Timestamp> {
    let raw = raw?;
    let parsed = Timestamp::parse(raw);
    if parsed.is_none() {
        tracing::debug!(value = raw, "Ignoring unparseable Buildkite timestamp");
    }
    parsed
}
