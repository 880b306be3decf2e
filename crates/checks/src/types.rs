//! Check-run vocabulary shared by the webhook and environment paths.
//!
//! These mirror the GitHub check-runs API input parameters. Every optional
//! field is omitted from the encoded JSON when absent: the API treats an
//! explicit `null` differently from a missing key for several of them.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{BranchName, CheckRunId, CommitSha, ExternalId};

// ---------------------------------------------------------------------------
// Status and conclusion
// ---------------------------------------------------------------------------

/// Lifecycle phase of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting for an agent.
    Queued,
    /// Running, or paused waiting on a human.
    InProgress,
    /// Finished; a [`Conclusion`] is expected alongside.
    Completed,
}

/// Final outcome of a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Rendered report attached to a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Run details
// ---------------------------------------------------------------------------

/// Check-run fields sent on create or update, and the shape existing runs
/// are read back as.
///
/// `head_sha`/`head_branch` are only valid on create; `id` is only known
/// after GitHub has created the run. [`crate::Decision`] enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CheckRunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<CommitSha>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_branch: Option<BranchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
}

impl RunDetails {
    /// Creates run details carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp with second precision.
///
/// Encodes as ISO-8601 with a `Z` suffix (`2024-05-01T12:00:00Z`), which is
/// the only form the check-runs API documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time, truncated to whole seconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`], dropping sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(0))
    }

    /// Parses an RFC 3339 timestamp or Buildkite's `YYYY-MM-DD HH:MM:SS UTC`.
    ///
    /// Returns `None` when neither form matches.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(Self::from_utc(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f UTC")
            .ok()
            .map(|naive| Self::from_utc(naive.and_utc()))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_timestamp_accepts_both_forms() {
        let rfc = Timestamp::parse("2024-05-01T12:30:45.123+02:00").unwrap();
        assert_eq!(rfc.to_string(), "2024-05-01T10:30:45Z");

        let buildkite = Timestamp::parse("2024-05-01 10:30:45 UTC").unwrap();
        assert_eq!(buildkite, rfc);

        assert!(Timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_run_details_omit_absent_fields() {
        let mut run = RunDetails::named("lint");
        run.status = Some(Status::InProgress);
        run.started_at = Timestamp::parse("2024-05-01T10:30:45Z");

        let encoded = serde_json::to_value(&run).unwrap();
        assert_eq!(
            encoded,
            json!({
                "name": "lint",
                "status": "in_progress",
                "started_at": "2024-05-01T10:30:45Z",
            })
        );
    }

    #[test]
    fn test_run_details_decode_ignores_unknown_keys() {
        let decoded: RunDetails = serde_json::from_value(json!({
            "id": 42,
            "name": "lint",
            "external_id": "job-1",
            "conclusion": "timed_out",
            "app": {"slug": "checkbridge"},
            "check_suite": {"id": 9},
        }))
        .unwrap();

        assert_eq!(decoded.id, Some(CheckRunId::new(42)));
        assert_eq!(decoded.conclusion, Some(Conclusion::TimedOut));
        assert_eq!(decoded.external_id.unwrap().as_str(), "job-1");
    }

    #[test]
    fn test_run_details_decode_requires_name() {
        let result = serde_json::from_value::<RunDetails>(json!({"id": 1}));
        assert!(result.is_err());
    }
}
