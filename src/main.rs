mod app;
mod cli;
mod credential;
mod logging;
mod message;
mod pypistats;
mod slack;
mod stats;

use clap::Parser;
use cli::Cli;
use credential::StdinPrompt;
use logging::FILE_TARGET;
use std::process::ExitCode;

enum Outcome {
    Finished(anyhow::Result<()>),
    Interrupted,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = match cli.log_path() {
        Ok(Some(path)) => logging::init(&path),
        Ok(None) => Ok(logging::Logging::disabled()),
        Err(e) => Err(e),
    };
    let logging = match logging {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let config = match cli.credential_path() {
        Ok(credential_path) => app::RunConfig {
            packages: cli.packages,
            webhook_flag: cli.webhook_url,
            credential_path,
            stats_api: cli.stats_api,
        },
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(race(app::run(config, StdinPrompt), interrupted()));

    // A prompt may still be blocked on stdin; don't wait for it.
    runtime.shutdown_background();

    let code = exit_code(outcome);
    drop(logging);
    code
}

/// Runs `work` unless `interrupt` resolves first.
async fn race<F, I>(work: F, interrupt: I) -> Outcome
where
    F: Future<Output = anyhow::Result<()>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        result = work => Outcome::Finished(result),
        _ = interrupt => Outcome::Interrupted,
    }
}

/// Reports the outcome and maps it to the process exit status.
fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Finished(Ok(())) => ExitCode::SUCCESS,
        Outcome::Finished(Err(e)) => {
            tracing::error!(target: FILE_TARGET, "Error: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
        Outcome::Interrupted => {
            tracing::debug!("Interrupted");
            ExitCode::from(1)
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
