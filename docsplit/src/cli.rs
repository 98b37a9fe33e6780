//! Command-line interface definitions for docsplit

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the docsplit application
#[derive(Parser)]
#[command(name = "docsplit")]
#[command(version)]
#[command(
    about = "Split troubleshooting manuals into per-section packets",
    long_about = None
)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "docsplit.toml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where to cut, overriding the configuration
#[derive(Args, Debug, Clone, Copy)]
pub struct SplitArgs {
    /// Let the first heading start a kept section instead of joining the dropped leading content
    #[arg(long)]
    pub keep_first: bool,

    /// Offset applied to every cut (-1 keeps the element before each heading with its section)
    #[arg(long, allow_negative_numbers = true)]
    pub bias: Option<isize>,
}

/// Available subcommands for docsplit
#[derive(Subcommand)]
pub enum Commands {
    /// Split one manual into tagged section files
    Split {
        /// The .docx manual
        input: PathBuf,

        /// Output directory (defaults to <output_dir>/<manual name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tool name appended to every section
        #[arg(short, long)]
        tool: String,

        #[command(flatten)]
        split: SplitArgs,

        /// Also write metadata to this file (.csv for CSV, JSON lines otherwise)
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },

    /// List the sections of a manual without writing anything
    Sections {
        /// The .docx manual
        input: PathBuf,

        #[command(flatten)]
        split: SplitArgs,
    },

    /// Classify, split and render every manual in the input directory
    Prepare,

    /// Describe section diagrams and collect the final PDFs
    Annotate,

    /// Run prepare, then annotate
    Run,

    /// Write a configuration file with the default settings
    InitConfig {
        /// File to create (defaults to the --config path)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_split_with_negative_bias() {
        let cli = Cli::try_parse_from([
            "docsplit", "split", "Manual.docx", "--tool", "Lift", "--bias", "-1", "--keep-first",
        ])
        .unwrap();

        match cli.command {
            Commands::Split {
                input, tool, split, ..
            } => {
                assert_eq!(input, PathBuf::from("Manual.docx"));
                assert_eq!(tool, "Lift");
                assert_eq!(split.bias, Some(-1));
                assert!(split.keep_first);
            }
            _ => panic!("expected split"),
        }
        assert_eq!(cli.config, PathBuf::from("docsplit.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docsplit", "prepare", "--verbose", "-c", "other.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Commands::Prepare));
    }
}
