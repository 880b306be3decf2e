//! `checkbridge check`: one-off check-run commands.

use std::path::Path;

use anyhow::{Context, Result};
use checks::{environment_to_decision, JobEnvironment, Output, RepositoryName};
use clap::{Args, Subcommand};

use crate::GithubArgs;

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub github: GithubArgs,

    #[command(subcommand)]
    pub command: CheckCommand,
}

#[derive(Debug, Subcommand)]
pub enum CheckCommand {
    /// List the check runs on a commit, branch or tag
    List {
        /// Repository as `owner/repo` or a git remote URL
        repository: String,

        /// Commit SHA, branch or tag
        git_ref: String,
    },

    /// Publish the current Buildkite job as a check run
    ///
    /// Run from inside a job (typically a post-command hook): before the
    /// command exits the run is marked in progress, after it the run is
    /// completed with a conclusion from the exit status.
    FromJobEnv(OutputArgs),
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output title
    #[arg(long, requires = "output_summary")]
    pub output_title: Option<String>,

    /// Output summary (Markdown), or a file containing it
    #[arg(long, requires = "output_title")]
    pub output_summary: Option<String>,

    /// Output details (Markdown), or a file containing them
    #[arg(long, requires = "output_title")]
    pub output: Option<String>,
}

pub async fn run(args: CheckArgs) -> Result<()> {
    let client = args
        .github
        .client()?
        .context("a GitHub token is required (--github-token or GITHUB_TOKEN)")?;

    match args.command {
        CheckCommand::List {
            repository,
            git_ref,
        } => {
            let repository = RepositoryName::parse(&repository)?;
            let runs = client.list_for_ref(&repository, &git_ref).await?;
            print_json(&runs)
        }
        CheckCommand::FromJobEnv(output_args) => {
            let env = JobEnvironment::from_process_env()
                .context("reading the Buildkite job environment")?;
            let repository = RepositoryName::parse(&env.repo)?;
            let existing = client.list_for_ref(&repository, &env.commit).await?;

            let mut decision = environment_to_decision(&env, &existing)?;
            if let Some(output) = load_output(output_args)? {
                decision = decision.with_output(output);
            }
            let published = client.execute(&decision).await?;
            print_json(&published)
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Builds the check-run output from the command-line flags.
///
/// Summary and text values naming an existing file are replaced by its
/// contents.
fn load_output(args: OutputArgs) -> Result<Option<Output>> {
    let (Some(title), Some(summary)) = (args.output_title, args.output_summary) else {
        return Ok(None);
    };
    Ok(Some(Output {
        title,
        summary: read_if_file(summary)?,
        text: args.output.map(read_if_file).transpose()?,
    }))
}

fn read_if_file(value: String) -> Result<String> {
    let path = Path::new(&value);
    if path.is_file() {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    Ok(value)
}
