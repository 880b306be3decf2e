//! Create-or-update decisions for check runs.
//!
//! Both entry points take the check runs GitHub already has for the commit and
//! decide whether the incoming CI state creates a new run or updates one.
//! The caller is trusted to have scoped `existing` to the right repository and
//! commit; nothing here re-checks ownership of a matched run.

use std::collections::HashMap;

use serde::Serialize;

use crate::lifecycle::{run_details_from_environment_at, run_details_from_job};
use crate::{
    BranchName, CheckRunId, CommitSha, ExternalId, JobEnvironment, JobHook, Output,
    ReconcileError, RepositoryName, RunDetails, Timestamp,
};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What to do with a check run.
///
/// Construct through [`Decision::create`] and [`Decision::update`]; they
/// enforce that a create carries `head_sha`/`head_branch` and no id, and that
/// an update carries an id and neither head field (GitHub rejects changing
/// them after creation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create {
        repository: RepositoryName,
        run: RunDetails,
    },
    Update {
        repository: RepositoryName,
        id: CheckRunId,
        run: RunDetails,
    },
}

impl Decision {
    /// Builds a create decision.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidCreate`] if `run` lacks `head_sha` or
    /// `head_branch`, or already has an id.
    pub fn create(repository: RepositoryName, run: RunDetails) -> Result<Self, ReconcileError> {
        if run.head_sha.is_none() {
            return Err(ReconcileError::InvalidCreate("head_sha is required"));
        }
        if run.head_branch.is_none() {
            return Err(ReconcileError::InvalidCreate("head_branch is required"));
        }
        if run.id.is_some() {
            return Err(ReconcileError::InvalidCreate("id must not be set"));
        }
        Ok(Self::Create { repository, run })
    }

    /// Builds an update decision for run `id`, stripping the head fields.
    pub fn update(repository: RepositoryName, id: CheckRunId, mut run: RunDetails) -> Self {
        run.id = Some(id);
        run.head_sha = None;
        run.head_branch = None;
        Self::Update {
            repository,
            id,
            run,
        }
    }

    pub fn repository(&self) -> &RepositoryName {
        match self {
            Self::Create { repository, .. } | Self::Update { repository, .. } => repository,
        }
    }

    pub fn run(&self) -> &RunDetails {
        match self {
            Self::Create { run, .. } | Self::Update { run, .. } => run,
        }
    }

    /// Attaches a rendered report to the run.
    pub fn with_output(mut self, output: Output) -> Self {
        match &mut self {
            Self::Create { run, .. } | Self::Update { run, .. } => run.output = Some(output),
        }
        self
    }

    /// Describes the HTTP request that carries out this decision.
    ///
    /// The body is the run details with absent fields omitted. The run id is
    /// part of the path for updates and is never sent in the body.
    pub fn request(&self) -> Result<CheckRunRequest, serde_json::Error> {
        let mut body = serde_json::to_value(self.run())?;
        if let Some(object) = body.as_object_mut() {
            object.remove("id");
        }

        let RepositoryName { owner, repo } = self.repository();
        let (method, path) = match self {
            Self::Create { .. } => (
                RequestMethod::Post,
                format!("/repos/{owner}/{repo}/check-runs"),
            ),
            Self::Update { id, .. } => (
                RequestMethod::Patch,
                format!("/repos/{owner}/{repo}/check-runs/{id}"),
            ),
        };

        Ok(CheckRunRequest { method, path, body })
    }
}

/// HTTP verb for a check-run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestMethod {
    Post,
    Patch,
}

/// Transport-neutral description of a check-run API call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRunRequest {
    pub method: RequestMethod,
    /// Path relative to the API base URL.
    pub path: String,
    pub body: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Decides how a Buildkite job webhook lands on GitHub.
///
/// Existing runs are matched by `external_id` against the job id. A new run
/// takes its head commit and branch from the build.
///
/// # Errors
///
/// - [`ReconcileError::InvalidRepositoryUrl`] if the pipeline's repository
///   cannot be parsed.
/// - [`ReconcileError::MissingRecordId`] if the matched run has no id.
/// - [`ReconcileError::InvalidCreate`] if the build has an empty commit or
///   branch.
pub fn job_hook_to_decision(
    hook: &JobHook,
    existing: &[RunDetails],
) -> Result<Decision, ReconcileError> {
    let mut run = run_details_from_job(&hook.job);
    let repository = RepositoryName::parse(&hook.pipeline.repository)?;

    let by_external_id: HashMap<&ExternalId, &RunDetails> = existing
        .iter()
        .filter_map(|current| current.external_id.as_ref().map(|id| (id, current)))
        .collect();
    let matched = run
        .external_id
        .as_ref()
        .and_then(|id| by_external_id.get(id))
        .copied();

    match matched {
        Some(current) => {
            let id = current
                .id
                .ok_or_else(|| ReconcileError::MissingRecordId(hook.job.id.clone()))?;
            tracing::debug!(job = %hook.job.id, check_run = %id, "Updating existing check run");
            Ok(Decision::update(repository, id, run))
        }
        None => {
            run.head_sha = CommitSha::new(hook.build.commit.as_str());
            run.head_branch = BranchName::new(hook.build.branch.as_str());
            tracing::debug!(job = %hook.job.id, "Creating check run");
            Decision::create(repository, run)
        }
    }
}

/// Decides how a job, seen from inside its own environment, lands on GitHub.
///
/// The environment path never learns a run id before the first create, so
/// existing runs are matched by `name` (the job label).
///
/// # Errors
///
/// - [`ReconcileError::NotACiEnvironment`] unless `CI` and `BUILDKITE` are set.
/// - [`ReconcileError::InvalidRepositoryUrl`] if `BUILDKITE_REPO` cannot be
///   parsed.
/// - [`ReconcileError::MissingRecordId`] if the matched run has no id.
pub fn environment_to_decision(
    env: &JobEnvironment,
    existing: &[RunDetails],
) -> Result<Decision, ReconcileError> {
    environment_to_decision_at(env, existing, Timestamp::now())
}

/// Same as [`environment_to_decision`] with an explicit `now`.
pub fn environment_to_decision_at(
    env: &JobEnvironment,
    existing: &[RunDetails],
    now: Timestamp,
) -> Result<Decision, ReconcileError> {
    let mut run = run_details_from_environment_at(env, now)?;
    let repository = RepositoryName::parse(&env.repo)?;

    let by_name: HashMap<&str, &RunDetails> = existing
        .iter()
        .map(|current| (current.name.as_str(), current))
        .collect();

    match by_name.get(run.name.as_str()).copied() {
        Some(current) => {
            let id = current
                .id
                .ok_or_else(|| ReconcileError::MissingRecordId(run.name.clone()))?;
            Ok(Decision::update(repository, id, run))
        }
        None => {
            run.head_sha = CommitSha::new(env.commit.as_str());
            run.head_branch = BranchName::new(env.branch.as_str());
            Decision::create(repository, run)
        }
    }
}
