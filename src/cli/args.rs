//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::application::{ColorMode, OutputFormat};
use crate::domain::{Direction, RoundingPolicy};

/// Ancestral biogeography reconstruction on Newick trees
#[derive(Parser, Debug)]
#[command(name = "biogeo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory searched for .biogeo.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotate every node with its location distribution
    Annotate {
        /// Newick tree file
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// Label of the subtree root to analyse (default: tree root)
        #[arg(short, long)]
        node: Option<String>,

        /// Colouring mode: specific or broad
        #[arg(short, long)]
        mode: Option<ColorMode>,

        /// Ladderize direction: asc or desc
        #[arg(short, long)]
        ladderize: Option<Direction>,

        /// Keep input child order
        #[arg(long, conflicts_with = "ladderize")]
        no_ladderize: bool,

        /// Rounding policy: presentation or per-node
        #[arg(short, long)]
        rounding: Option<RoundingPolicy>,

        /// Decimals kept per node
        #[arg(short, long)]
        precision: Option<u32>,

        /// Output layout
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
        format: OutputFormat,
    },

    /// Decode leaf labels into display name and location
    Leaves {
        /// Newick tree file
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
