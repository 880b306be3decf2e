//! Checkbridge entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks via `clap`.
//! 2. **Wire observability**: `tracing-subscriber` with an `EnvFilter`, plain
//!    or JSON output, and an OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT`
//!    is set.
//! 3. **Construct infrastructure**: resolve webhook secrets, build the GitHub
//!    check-run client, register listeners, and freeze them into endpoints.
//! 4. **Run a command**:
//!    - `serve`: receive GitHub and Buildkite webhooks.
//!    - `check list`: print the check runs on a ref.
//!    - `check from-job-env`: publish the current Buildkite job as a check run.

mod bridge;
mod check;
mod serve;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use github::{CheckRunClient, StaticToken, DEFAULT_API_URL};

#[derive(Debug, Parser)]
#[command(name = "checkbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bridges Buildkite jobs to GitHub check runs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Receive GitHub and Buildkite webhooks
    Serve(serve::ServeArgs),

    /// Inspect or publish check runs directly
    Check(check::CheckArgs),
}

/// GitHub API settings shared by every command that talks to GitHub.
#[derive(Debug, Args)]
pub struct GithubArgs {
    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Token used for check-run calls
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

impl GithubArgs {
    /// The check-run client, or `None` without a token.
    pub fn client(&self) -> Result<Option<CheckRunClient>> {
        let Some(token) = self.github_token.as_deref() else {
            return Ok(None);
        };
        let auth = Arc::new(StaticToken::new(token)?);
        Ok(Some(CheckRunClient::new(self.github_api_url.as_str(), auth)?))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = match telemetry::init_tracing(cli.log_json, telemetry::level_for(cli.verbose))
    {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Serve(args) => serve::run(args).await,
        Command::Check(args) => check::run(args).await,
    };
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "checkbridge",
            "-vv",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--github-webhook-secret",
            "s3cret",
            "--github-api-url",
            "https://ghe.example.com/api/v3",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.port(), 9000);
        assert_eq!(args.github_webhook_secret.as_deref(), Some("s3cret"));
        assert_eq!(args.buildkite_webhook_token, None);
        assert_eq!(args.github.github_api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_output_title_requires_summary() {
        let result = Cli::try_parse_from([
            "checkbridge",
            "check",
            "from-job-env",
            "--output-title",
            "Report",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_list_arguments() {
        let cli = Cli::try_parse_from([
            "checkbridge",
            "check",
            "list",
            "octo/widgets",
            "main",
        ])
        .unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert!(matches!(
            args.command,
            check::CheckCommand::List { repository, git_ref }
                if repository == "octo/widgets" && git_ref == "main"
        ));
    }

    #[test]
    fn test_no_token_means_no_client() {
        let args = GithubArgs {
            github_api_url: DEFAULT_API_URL.into(),
            github_token: None,
        };
        assert!(args.client().unwrap().is_none());
    }
}
