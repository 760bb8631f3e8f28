//! Command-line interface definitions for mdviz

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the mdviz host
#[derive(Parser)]
#[command(name = "mdviz")]
#[command(version)]
#[command(about = "Markdown visualizer: live preview and paginated PDF export", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Export a markdown file as a paginated PDF
    Export {
        /// Markdown file to export
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Directory the PDF is written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Export configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write the live preview of a markdown file as HTML
    Preview {
        /// Markdown file to preview
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output HTML file (defaults to INPUT with an .html extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default export configuration
    InitConfig {
        /// Where to write the configuration
        #[arg(value_name = "PATH", default_value = "mdviz.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_defaults() {
        let cli = Cli::try_parse_from(["mdviz", "export", "notes.md"]).unwrap();

        match cli.command {
            Commands::Export {
                input,
                output,
                config,
                verbose,
            } => {
                assert_eq!(input, PathBuf::from("notes.md"));
                assert_eq!(output, PathBuf::from("."));
                assert!(config.is_none());
                assert!(!verbose);
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_init_config_default_path() {
        let cli = Cli::try_parse_from(["mdviz", "init-config", "--force"]).unwrap();

        assert!(matches!(
            cli.command,
            Commands::InitConfig { ref path, force: true } if path == &PathBuf::from("mdviz.toml")
        ));
    }

    #[test]
    fn test_export_requires_input() {
        assert!(Cli::try_parse_from(["mdviz", "export"]).is_err());
    }
}
