//! `checkbridge serve`: the webhook server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use checks::JobEvent;
use clap::Args;
use listener::{
    resolve_secret, router, AppState, Mind, PingListener, Provider, SignalSet, WebhookEndpoint,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::bridge::JobCheckListener;
use crate::GithubArgs;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "CHECKBRIDGE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// GitHub webhook secret, or a file containing it [default: $GITHUB_WEBHOOK_SECRET]
    #[arg(long)]
    pub github_webhook_secret: Option<String>,

    /// Buildkite webhook token, or a file containing it [default: $BUILDKITE_WEBHOOK_SECRET]
    #[arg(long)]
    pub buildkite_webhook_token: Option<String>,

    #[command(flatten)]
    pub github: GithubArgs,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let github_secret = resolve_secret(
        args.github_webhook_secret.as_deref(),
        Provider::GitHub.secret_env_var(),
    )
    .context("resolving GitHub webhook secret")?;
    let buildkite_secret = resolve_secret(
        args.buildkite_webhook_token.as_deref(),
        Provider::Buildkite.secret_env_var(),
    )
    .context("resolving Buildkite webhook token")?;

    let mind = Arc::new(Mind::new());
    let mut github_signals = SignalSet::new();
    github_signals.register("ping", Arc::new(PingListener::new(Arc::clone(&mind))))?;

    let mut buildkite_signals = SignalSet::new();
    match args.github.client()? {
        Some(client) => {
            let jobs = Arc::new(JobCheckListener::new(client));
            for event in JobEvent::ALL {
                buildkite_signals.register(event.as_str(), jobs.clone())?;
            }
        }
        None => warn!("No GitHub token configured; Buildkite job events will not be reconciled"),
    }

    let state = AppState::new(
        [
            WebhookEndpoint::new(Provider::GitHub, github_secret, github_signals),
            WebhookEndpoint::new(Provider::Buildkite, buildkite_secret, buildkite_signals),
        ],
        mind,
    );

    let tcp = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %tcp.local_addr()?, "Listening for webhooks");

    axum::serve(tcp, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
