//! Mapping from Buildkite lifecycle state to check-run status and conclusion.
//!
//! All functions here are pure. The environment path reads the clock, so it
//! has an `_at` variant taking the current time explicitly.

use crate::buildkite::parse_timestamp;
use crate::{
    Conclusion, ExternalId, Job, JobEnvironment, JobState, ReconcileError, RunDetails, Status,
    Timestamp,
};

/// Check-run status for a job state.
///
/// Scheduled jobs are queued; running, canceling, and blocked jobs are in
/// progress. Everything else is completed.
pub fn status_for(state: JobState) -> Status {
    match state {
        JobState::Scheduled => Status::Queued,
        JobState::Running | JobState::Canceling | JobState::Blocked => Status::InProgress,
        _ => Status::Completed,
    }
}

/// Check-run conclusion for a job state, if the state has one.
///
/// A blocked job is reported as `action_required` even though its status is
/// still `in_progress`: the block step is waiting on a person.
pub fn conclusion_for(state: JobState) -> Option<Conclusion> {
    match state {
        JobState::Passed => Some(Conclusion::Success),
        JobState::Failed => Some(Conclusion::Failure),
        JobState::Blocked => Some(Conclusion::ActionRequired),
        JobState::Canceled => Some(Conclusion::Cancelled),
        JobState::Skipped | JobState::NotRun => Some(Conclusion::Neutral),
        _ => None,
    }
}

/// Builds run details from a webhook job record.
///
/// `head_sha`/`head_branch` are left unset; they belong to the build and are
/// only stamped on when the run is created.
pub fn run_details_from_job(job: &Job) -> RunDetails {
    RunDetails {
        name: job.name.clone(),
        details_url: Some(job.web_url.clone()),
        external_id: ExternalId::new(job.id.as_str()),
        status: Some(status_for(job.state)),
        conclusion: conclusion_for(job.state),
        started_at: parse_timestamp(job.started_at.as_deref()),
        completed_at: parse_timestamp(job.finished_at.as_deref()),
        ..RunDetails::default()
    }
}

/// Builds run details from a job environment snapshot, using the current time.
///
/// # Errors
///
/// Returns [`ReconcileError::NotACiEnvironment`] unless both `CI` and
/// `BUILDKITE` are set.
pub fn run_details_from_environment(env: &JobEnvironment) -> Result<RunDetails, ReconcileError> {
    run_details_from_environment_at(env, Timestamp::now())
}

/// Same as [`run_details_from_environment`] with an explicit `now`.
///
/// Without an exit status the job is still running: the run is
/// `in_progress` and `started_at` is `now`. With one, the run is
/// `completed` at `now`. Exit status 0 is `success`; otherwise a timed-out
/// job is `timed_out`, and anything else is `failure`.
pub fn run_details_from_environment_at(
    env: &JobEnvironment,
    now: Timestamp,
) -> Result<RunDetails, ReconcileError> {
    if !(env.ci && env.buildkite) {
        return Err(ReconcileError::NotACiEnvironment);
    }

    let mut run = RunDetails::named(env.label.as_str());
    run.details_url = Some(format!("{}#{}", env.build_url, env.job_id));
    run.external_id = ExternalId::new(env.job_id.as_str());

    match env.command_exit_status {
        None => {
            run.status = Some(Status::InProgress);
            run.started_at = Some(now);
        }
        Some(exit_status) => {
            run.status = Some(Status::Completed);
            run.completed_at = Some(now);
            run.conclusion = Some(if exit_status == 0 {
                Conclusion::Success
            } else if env.timeout {
                Conclusion::TimedOut
            } else {
                Conclusion::Failure
            });
        }
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(exit_status: Option<i32>, timeout: bool) -> JobEnvironment {
        JobEnvironment {
            ci: true,
            buildkite: true,
            label: "test".into(),
            commit: "deadbeef".into(),
            branch: "main".into(),
            repo: "https://github.com/octo/widgets.git".into(),
            build_url: "https://buildkite.com/octo/widgets/builds/7".into(),
            job_id: "job-7".into(),
            command_exit_status: exit_status,
            timeout,
        }
    }

    fn fixed_now() -> Timestamp {
        Timestamp::parse("2024-05-01T10:30:45Z").unwrap()
    }

    #[test]
    fn test_status_for_every_state() {
        for state in JobState::ALL {
            let expected = match state {
                JobState::Scheduled => Status::Queued,
                JobState::Running | JobState::Canceling | JobState::Blocked => Status::InProgress,
                _ => Status::Completed,
            };
            assert_eq!(status_for(state), expected, "{state:?}");
        }
    }

    #[test]
    fn test_conclusion_absent_for_unfinished_states() {
        for state in [JobState::Scheduled, JobState::Running, JobState::Canceling] {
            assert_eq!(conclusion_for(state), None, "{state:?}");
        }
        assert_eq!(conclusion_for(JobState::Blocked), Some(Conclusion::ActionRequired));
        assert_eq!(conclusion_for(JobState::Canceled), Some(Conclusion::Cancelled));
        assert_eq!(conclusion_for(JobState::NotRun), Some(Conclusion::Neutral));
    }

    #[test]
    fn test_environment_without_exit_status_is_in_progress() {
        let run = run_details_from_environment_at(&environment(None, false), fixed_now()).unwrap();
        assert_eq!(run.status, Some(Status::InProgress));
        assert_eq!(run.started_at, Some(fixed_now()));
        assert_eq!(run.completed_at, None);
        assert_eq!(run.conclusion, None);
        assert_eq!(
            run.details_url.as_deref(),
            Some("https://buildkite.com/octo/widgets/builds/7#job-7")
        );
        assert_eq!(run.external_id.unwrap().as_str(), "job-7");
    }

    #[test]
    fn test_environment_conclusions() {
        let cases = [
            (0, false, Conclusion::Success),
            (0, true, Conclusion::Success),
            (1, false, Conclusion::Failure),
            (-1, true, Conclusion::TimedOut),
        ];
        for (exit_status, timeout, expected) in cases {
            let run = run_details_from_environment_at(
                &environment(Some(exit_status), timeout),
                fixed_now(),
            )
            .unwrap();
            assert_eq!(run.status, Some(Status::Completed));
            assert_eq!(run.conclusion, Some(expected), "exit {exit_status}");
            assert_eq!(run.completed_at, Some(fixed_now()));
            assert_eq!(run.started_at, None);
        }
    }

    #[test]
    fn test_environment_requires_ci_flags() {
        let mut env = environment(None, false);
        env.buildkite = false;
        assert_eq!(
            run_details_from_environment(&env),
            Err(ReconcileError::NotACiEnvironment)
        );
    }

    #[test]
    fn test_now_is_second_precision_utc() {
        let run = run_details_from_environment(&environment(None, false)).unwrap();
        let rendered = run.started_at.unwrap().to_string();
        assert!(rendered.ends_with('Z'), "{rendered}");
        assert_eq!(rendered.len(), "2024-05-01T10:30:45Z".len());
    }
}
