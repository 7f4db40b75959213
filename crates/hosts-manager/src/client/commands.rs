//! Handlers bridging CLI arguments to service operations

use anyhow::{Context, Result};
use hosts_manager_common::Entry;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::client::{output::print_items, Commands, OutputFormat};
use crate::server::messages::BatchRequest;
use crate::server::reconcile::BatchOutcome;
use crate::server::service::HostsService;

/// Problems with what the user asked for, reported with exit code 2
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("No entry at line {0}; run `list` to see current lines")]
    NoEntryAtLine(usize),

    #[error("Nothing to change: pass at least one of --address, --hostname, --comment, --enable, --disable")]
    NothingToEdit,

    #[error("Invalid batch file {}: {source}", .path.display())]
    InvalidBatch {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub async fn handle(
    service: &HostsService,
    command: Commands,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match command {
        Commands::List => {
            let entries = service.get_entries().await?;
            print_items(&entries, format);
        }

        Commands::Add {
            address,
            hostname,
            comment,
            disabled,
        } => {
            let mut entry = Entry::new(address, hostname);
            entry.comment = non_blank(comment);
            entry.enabled = !disabled;

            let outcome = service.add_entries(vec![entry]).await?;
            report(&outcome, quiet);
        }

        Commands::Edit {
            line,
            address,
            hostname,
            comment,
            enable,
            disable,
        } => {
            if address.is_none() && hostname.is_none() && comment.is_none() && !enable && !disable
            {
                return Err(UsageError::NothingToEdit.into());
            }

            let original = claim_lines(service, &[line]).await?.remove(0);
            let mut changed = original.clone();
            changed.line = None;
            if let Some(address) = address {
                changed.address = address;
            }
            if let Some(hostname) = hostname {
                changed.hostname = hostname;
            }
            if comment.is_some() {
                changed.comment = non_blank(comment);
            }
            if enable || disable {
                changed.enabled = enable;
            }

            let outcome = service.edit_entries(vec![original], vec![changed]).await?;
            report(&outcome, quiet);
        }

        Commands::Delete { lines } => {
            let claims = claim_lines(service, &lines).await?;
            let outcome = service.delete_entries(claims).await?;
            report(&outcome, quiet);
        }

        Commands::Apply { file } => {
            let request = read_batch(&file)?;
            let outcome = service.apply_request(request).await?;
            report(&outcome, quiet);
        }

        // Answered before a service is built
        Commands::Config => {}
    }

    Ok(())
}

/// Snapshot the entries at `lines` as claims for an edit or delete
async fn claim_lines(service: &HostsService, lines: &[usize]) -> Result<Vec<Entry>> {
    let entries = service.get_entries().await?;
    lines
        .iter()
        .map(|&line| {
            entries
                .iter()
                .find(|e| e.line == Some(line))
                .cloned()
                .ok_or_else(|| anyhow::Error::from(UsageError::NoEntryAtLine(line)))
        })
        .collect()
}

fn read_batch(path: &Path) -> Result<BatchRequest> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read batch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file {}", path.display()))?
    };

    let request = serde_json::from_str(&content).map_err(|source| UsageError::InvalidBatch {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(request)
}

fn non_blank(comment: Option<String>) -> Option<String> {
    comment.filter(|c| !c.trim().is_empty())
}

fn report(outcome: &BatchOutcome, quiet: bool) {
    if quiet {
        return;
    }
    if outcome.written {
        eprintln!(
            "{}: {} applied, {} entries in file",
            outcome.kind, outcome.applied, outcome.entry_count
        );
    } else {
        eprintln!("{}: nothing to do", outcome.kind);
    }
}
