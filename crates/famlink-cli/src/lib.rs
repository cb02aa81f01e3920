//! # famlink-cli — Command-Line Interface
//!
//! ## Subcommands
//!
//! - `serve`: run the HTTP service
//! - `config`: print the effective configuration as YAML
//!
//! Argument parsing lives in `main.rs`; the handlers here only wire the
//! library crates together.

pub mod config_cmd;
pub mod logging;
pub mod serve;
