//! hosts-manager library crate
//!
//! Exposes the reconciliation service and the CLI entry point so tests and
//! other front ends can drive the same code the binary runs.

pub mod client;
pub mod server;

use anyhow::Result;
use std::process::ExitCode;

/// Main entry point for the hosts-manager binary.
pub async fn run() -> Result<ExitCode> {
    client::run().await
}
