//! Report which storage backend the current settings select
//!
//! Run with: cargo run --bin backend_probe -- --config data/config.ini.php

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures_util::{StreamExt, TryStreamExt};
use object_store::ObjectStore;
use serde::Serialize;
use storage_switch::{select_from_file, ConfigWarning, SelectionOutcome};

#[derive(Parser)]
#[command(name = "backend_probe", version, about)]
struct Cli {
    /// Settings file holding `<Backend>_<option>` keys
    #[arg(long, env = "STORAGE_SWITCH_CONFIG", default_value = "data/config.ini.php")]
    config: PathBuf,

    /// Data directory used by the local default backend
    #[arg(long, env = "STORAGE_SWITCH_DATA", default_value = "data")]
    data_dir: PathBuf,

    /// Sub-folder to root the filesystem handle under
    #[arg(long, default_value = "")]
    prefix: String,

    /// List up to this many files under the selected handle
    #[arg(long, value_name = "LIMIT")]
    list: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    backend: &'a str,
    target: String,
    outcome: &'a SelectionOutcome,
    warnings: &'a [ConfigWarning],
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let selection = select_from_file(&cli.config, &cli.data_dir);
    let backend = selection.backend();

    let files = match cli.list {
        Some(limit) => {
            let store = backend
                .data(&cli.prefix)
                .with_context(|| format!("Failed to open {} storage", backend.name()))?;
            let objects: Vec<_> = store
                .list(None)
                .take(limit)
                .try_collect()
                .await
                .with_context(|| format!("Failed to list {}", backend.data_name()))?;
            Some(objects.into_iter().map(|meta| meta.location.to_string()).collect())
        }
        None => None,
    };

    let report = Report {
        backend: backend.name(),
        target: backend.data_name(),
        outcome: selection.outcome(),
        warnings: selection.warnings(),
        files,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Backend: {}", report.backend);
    println!("Target:  {}", report.target);
    match report.outcome {
        SelectionOutcome::Custom { .. } => println!("Reason:  configured custom backend"),
        SelectionOutcome::Default { fallback } => println!("Reason:  {}", fallback),
    }
    for warning in report.warnings {
        println!("Warning: {}", warning);
    }
    if let Some(files) = &report.files {
        for file in files {
            println!("  {}", file);
        }
    }

    Ok(())
}
