//! Binary entry point for the `dropsync` CLI.

use std::env;
use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;

use dropsync::{DigitalOceanSource, ProfileStore, SyncOrchestrator, expand_tilde};

mod cli;

use cli::Cli;

const DEFAULT_SSH_CONFIG: &str = "~/.ssh/config";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("sync failed: {0}")]
    Sync(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match sync_command(cli).await {
        Ok(count) => {
            let mut stdout = io::stdout();
            writeln!(stdout).ok();
            writeln!(stdout, "{}", render_done_line(count)).ok();
            0
        }
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn sync_command(args: Cli) -> Result<usize, CliError> {
    if let Some(result) = fake_sync_from_env() {
        return result;
    }

    let mut stdout = io::stdout();
    writeln!(stdout, "· Reading profile '{}'", args.profile).ok();
    let profile = ProfileStore::new()
        .load(&args.profile)
        .map_err(|err| CliError::Config(err.to_string()))?;

    let source = DigitalOceanSource::new(profile.token.clone())
        .map_err(|err| CliError::Backend(err.to_string()))?;
    let orchestrator = SyncOrchestrator::new(source);

    let target = args
        .ssh_config
        .as_deref()
        .map_or_else(|| expand_tilde(DEFAULT_SSH_CONFIG), str::to_owned);
    let target_path = Utf8PathBuf::from(target);

    writeln!(stdout, "· Fetching droplets from DigitalOcean").ok();
    writeln!(stdout, "· Writing {target_path}").ok();
    let report = orchestrator
        .execute(&profile, &target_path)
        .await
        .map_err(|err| CliError::Sync(err.to_string()))?;

    Ok(report.instances)
}

fn render_done_line(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("✓ Done, {count} droplet{plural} synced")
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "Error: {err}").ok();
}

/// Fake outcomes for behavioural CLI tests, driven by environment
/// variables so the tests never touch the network or the real SSH config.
fn fake_sync_from_env() -> Option<Result<usize, CliError>> {
    let mode = env::var("DROPSYNC_FAKE_SYNC_MODE").ok()?;
    match mode.as_str() {
        "synced-1" => Some(Ok(1)),
        "synced-2" => Some(Ok(2)),
        "config" => Some(Err(CliError::Config(String::from(
            "profile 'fake' not found",
        )))),
        "backend" => Some(Err(CliError::Backend(String::from(
            "DigitalOcean rejected the API token",
        )))),
        "sync" => Some(Err(CliError::Sync(String::from(
            "end marker '#E' not found after the start marker",
        )))),
        _ => None,
    }
}
