//! Command-line interface definitions for the `dropsync` binary.
//!
//! This module centralises the clap parser structure so both the main binary
//! and the build script can reuse it when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `dropsync` binary.
#[derive(Debug, Parser)]
#[command(
    name = "dropsync",
    about = "Sync DigitalOcean droplets into your SSH client configuration",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Name of the profile to load (for example `production`).
    ///
    /// The profile is read from `~/.config/dropsync/<NAME>.json` and holds
    /// the API token, the managed-region markers, and the tag-to-key table.
    #[arg(value_name = "PROFILE")]
    pub(crate) profile: String,
    /// Override the SSH configuration file to rewrite.
    ///
    /// Defaults to `~/.ssh/config`. The file must already contain the start
    /// and end marker lines configured in the profile.
    #[arg(long, value_name = "PATH")]
    pub(crate) ssh_config: Option<String>,
}
