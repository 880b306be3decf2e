//! Buildkite job webhooks → GitHub check runs.

use async_trait::async_trait;
use checks::{job_hook_to_decision, JobHook, RepositoryName};
use github::CheckRunClient;
use listener::{ListenerError, Signal, SignalListener};
use serde::Deserialize;

/// Reconciles every Buildkite job event against the check runs already on
/// the build's commit, then publishes the result.
pub struct JobCheckListener {
    client: CheckRunClient,
}

impl JobCheckListener {
    pub fn new(client: CheckRunClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SignalListener for JobCheckListener {
    async fn on_signal(&self, signal: &Signal) -> Result<(), ListenerError> {
        let hook = JobHook::deserialize(&signal.body)?;
        let repository = RepositoryName::parse(&hook.pipeline.repository)?;

        let existing = self
            .client
            .list_for_ref(&repository, &hook.build.commit)
            .await?;
        let decision = job_hook_to_decision(&hook, &existing)?;
        let published = self.client.execute(&decision).await?;

        tracing::info!(
            job = %hook.job.id,
            event = hook.event.as_str(),
            repository = %repository,
            status = ?published.status,
            conclusion = ?published.conclusion,
            "Reconciled job"
        );
        Ok(())
    }
}
