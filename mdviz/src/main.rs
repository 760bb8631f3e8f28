//! mdviz - markdown visualizer host
//!
//! Drives an editor session from the command line: exports markdown files
//! to paginated PDFs and writes live-preview HTML.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![allow(clippy::module_name_repetitions)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use mdviz::config::ExportConfig;
use mdviz::export::ExportEngine;
use mdviz::persist::DirectorySink;
use mdviz::preview;
use mdviz::session::{EditorSession, Notification, NotificationVariant, Notifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prints notifications to stderr
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let marker = match notification.variant {
            NotificationVariant::Default => "✓",
            NotificationVariant::Destructive => "✗",
        };
        eprintln!(
            "{} {}: {}",
            marker, notification.title, notification.description
        );
    }
}

/// Main entry point for the mdviz CLI application
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            config,
            verbose,
        } => {
            init_logging(verbose);
            handle_export_command(&input, output, config.as_deref()).await?;
        }

        Commands::Preview { input, output } => {
            init_logging(false);
            handle_preview_command(&input, output)?;
        }

        Commands::InitConfig { path, force } => {
            init_logging(false);
            handle_init_config_command(&path, force)?;
        }
    }

    Ok(())
}

/// Initialize logging; `RUST_LOG` overrides the level
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Handle the export command
async fn handle_export_command(
    input: &Path,
    output: PathBuf,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ExportConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ExportConfig::default(),
    };

    let markdown = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let sink = Arc::new(DirectorySink::new(output));
    let engine = ExportEngine::from_config(&config, sink)
        .with_context(|| "Failed to set up the export engine")?;

    let mut session = EditorSession::new(engine, ConsoleNotifier);
    session.set_document(markdown);

    let exported = session
        .export_pdf()
        .await
        .with_context(|| format!("Failed to export {}", input.display()))?;

    println!("{}", exported.path.display());
    Ok(())
}

/// Handle the preview command
fn handle_preview_command(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let markdown = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let output = output.unwrap_or_else(|| input.with_extension("html"));
    let title = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Preview".to_string());

    std::fs::write(&output, preview::to_html_page(&markdown, &title))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

/// Handle the init-config command
fn handle_init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    ExportConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Wrote default configuration to {}", path.display());
    Ok(())
}
