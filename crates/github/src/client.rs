//! Check-run REST client.

use std::sync::Arc;

use checks::{
    BranchName, CheckRunId, CommitSha, Conclusion, Decision, ExternalId, Output, RepositoryName,
    RequestMethod, RunDetails, Status, Timestamp,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{GithubError, InstallationHeaders};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Executes check-run decisions against the GitHub REST API.
///
/// Every call is single-shot; retry policy belongs to the caller.
#[derive(Clone)]
pub struct CheckRunClient {
    http: reqwest::Client,
    api_base: String,
    auth: Arc<dyn InstallationHeaders>,
}

impl CheckRunClient {
    /// # Errors
    ///
    /// Returns [`GithubError::Request`] if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        auth: Arc<dyn InstallationHeaders>,
    ) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("checkbridge"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Creates or updates the check run described by `decision`.
    ///
    /// Returns the check run as GitHub recorded it.
    ///
    /// # Errors
    ///
    /// - [`GithubError::Status`] on a non-2xx response.
    /// - [`GithubError::Request`] / [`GithubError::Decode`] on transport or
    ///   body failures.
    pub async fn execute(&self, decision: &Decision) -> Result<RunDetails, GithubError> {
        let request = decision.request()?;
        let method = match request.method {
            RequestMethod::Post => Method::POST,
            RequestMethod::Patch => Method::PATCH,
        };
        tracing::info!(
            method = %method,
            path = %request.path,
            name = %decision.run().name,
            "Publishing check run"
        );

        let remote: RemoteCheckRun = self
            .send(
                method,
                &request.path,
                &decision.repository().owner,
                Some(&request.body),
            )
            .await?;
        let run = remote.into_run_details();
        if let Some(id) = run.id {
            tracing::info!(check_run = %id, "Check run published");
        }
        Ok(run)
    }

    /// Lists the check runs on `git_ref` in `repository`, following pages.
    ///
    /// # Errors
    ///
    /// See [`CheckRunClient::execute`].
    pub async fn list_for_ref(
        &self,
        repository: &RepositoryName,
        git_ref: &str,
    ) -> Result<Vec<RunDetails>, GithubError> {
        let mut runs = Vec::new();
        for page in 1.. {
            let path = format!(
                "/repos/{}/{}/commits/{git_ref}/check-runs?per_page={PAGE_SIZE}&page={page}",
                repository.owner, repository.repo
            );
            let list: CheckRunList = self
                .send(Method::GET, &path, &repository.owner, None)
                .await?;
            let received = list.check_runs.len();
            runs.extend(list.check_runs.into_iter().map(RemoteCheckRun::into_run_details));
            if received < PAGE_SIZE || runs.len() >= list.total_count {
                break;
            }
        }
        tracing::debug!(
            repository = %repository,
            git_ref,
            count = runs.len(),
            "Listed check runs"
        );
        Ok(runs)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        owner: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, GithubError> {
        let auth = self.auth.headers_for(owner).await?;
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.api_base))
            .headers(auth);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::warn!(status = status.as_u16(), path, "GitHub rejected request");
            return Err(GithubError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CheckRunList {
    total_count: usize,
    check_runs: Vec<RemoteCheckRun>,
}

/// A check run as GitHub returns it. Many fields are nullable and the status
/// and conclusion vocabularies are wider than what this service writes.
#[derive(Debug, Deserialize)]
struct RemoteCheckRun {
    id: u64,
    name: String,
    #[serde(default)]
    head_sha: Option<String>,
    #[serde(default)]
    details_url: Option<String>,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    output: Option<RemoteOutput>,
    #[serde(default)]
    check_suite: Option<RemoteCheckSuite>,
}

#[derive(Debug, Deserialize)]
struct RemoteOutput {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteCheckSuite {
    #[serde(default)]
    head_branch: Option<String>,
}

impl RemoteCheckRun {
    fn into_run_details(self) -> RunDetails {
        let output = self.output.and_then(|output| {
            Some(Output {
                title: output.title?,
                summary: output.summary?,
                text: output.text,
            })
        });
        RunDetails {
            name: self.name,
            id: Some(CheckRunId::new(self.id)),
            head_sha: self.head_sha.and_then(CommitSha::new),
            head_branch: self
                .check_suite
                .and_then(|suite| suite.head_branch)
                .and_then(BranchName::new),
            details_url: self.details_url.filter(|url| !url.is_empty()),
            external_id: self.external_id.and_then(ExternalId::new),
            status: self.status.as_deref().and_then(status_from_wire),
            started_at: self.started_at.as_deref().and_then(Timestamp::parse),
            conclusion: self.conclusion.as_deref().and_then(conclusion_from_wire),
            completed_at: self.completed_at.as_deref().and_then(Timestamp::parse),
            output,
        }
    }
}

fn status_from_wire(value: &str) -> Option<Status> {
    match value {
        "queued" => Some(Status::Queued),
        "in_progress" => Some(Status::InProgress),
        "completed" => Some(Status::Completed),
        _ => None,
    }
}

fn conclusion_from_wire(value: &str) -> Option<Conclusion> {
    match value {
        "success" => Some(Conclusion::Success),
        "failure" => Some(Conclusion::Failure),
        "neutral" => Some(Conclusion::Neutral),
        "cancelled" => Some(Conclusion::Cancelled),
        "timed_out" => Some(Conclusion::TimedOut),
        "action_required" => Some(Conclusion::ActionRequired),
        _ => None,
    }
}
