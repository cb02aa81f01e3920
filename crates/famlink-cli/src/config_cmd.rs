//! # Config Subcommand
//!
//! Prints the configuration `serve` would run with, after file and
//! environment layering, with secrets redacted.

use std::path::PathBuf;

use clap::Args;

use famlink_api::config::AppConfig;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// YAML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Render the effective configuration.
pub fn run(args: &ConfigArgs) -> anyhow::Result<String> {
    let config = AppConfig::load(args.config.as_deref())?;
    Ok(config.to_redacted_yaml()?)
}
