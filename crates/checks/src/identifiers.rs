//! Newtype domain identifiers.
//!
//! Every value that correlates records across the two providers is a distinct
//! newtype. This prevents accidentally passing a Buildkite job id where a
//! GitHub check-run id is expected, even though both arrive as JSON scalars.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ReconcileError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: integer-backed
// ---------------------------------------------------------------------------

/// Identifies a check run on GitHub.
///
/// Assigned by GitHub when the run is created; never known before the first
/// `POST` for a given job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckRunId(u64);

impl CheckRunId {
    /// Creates a new identifier from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CheckRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: string-backed
// ---------------------------------------------------------------------------

string_id! {
    /// The CI system's identifier for one job.
    ///
    /// Stored on the check run as `external_id`; it is the stable key that
    /// correlates a Buildkite job with its check run across updates.
    ExternalId
}

string_id! {
    /// A Git commit SHA (40-character lowercase hex string).
    CommitSha
}

string_id! {
    /// A Git branch name (e.g. `"main"`, `"feature/faster-builds"`).
    BranchName
}

// ---------------------------------------------------------------------------
// Repository coordinates
// ---------------------------------------------------------------------------

static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:https?|git|ssh)://(?:[^@/\s]+@)?[^/\s]+/|[^@/\s]+@[^:/\s]+:)?(?P<owner>[A-Za-z0-9_.-]+)/(?P<repo>[A-Za-z0-9_.-]+?)(?:\.git)?/?$",
    )
    .expect("remote URL pattern is valid")
});

/// A GitHub repository in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryName {
    /// Account or organisation that owns the repository.
    pub owner: String,
    /// Repository name without any `.git` suffix.
    pub repo: String,
}

impl RepositoryName {
    /// Extracts `owner/repo` from a git remote URL.
    ///
    /// Accepts `https://host/owner/repo[.git]`, `ssh://` and `git://` URLs,
    /// scp-style `git@host:owner/repo.git`, and a bare `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidRepositoryUrl`] for anything else,
    /// including nested group paths.
    pub fn parse(url: &str) -> Result<Self, ReconcileError> {
        let trimmed = url.trim();
        let captures = REMOTE_URL
            .captures(trimmed)
            .ok_or_else(|| ReconcileError::InvalidRepositoryUrl(url.to_string()))?;

        let owner = &captures["owner"];
        let repo = &captures["repo"];
        if owner.starts_with('.') || repo.starts_with('.') {
            return Err(ReconcileError::InvalidRepositoryUrl(url.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
