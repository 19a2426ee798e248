//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Attack tree tool: structural checks, simple/extended conversion and automatic layout
#[derive(Parser, Debug)]
#[command(name = "atdraw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory whose .atdraw.toml applies to config commands (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the save-time checks on a document
    Check {
        /// Attack tree document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Print the tree from its root
    Show {
        /// Attack tree document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Duplicate shared nodes so the document fits the simple schema
    Simplify {
        /// Attack tree document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Output file (default: overwrite input)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Compute node positions and print them
    Layout {
        /// Attack tree document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Keep positions already assigned and skip collision resolution
        #[arg(long)]
        fixed: bool,
    },

    /// Create a document with a single root threat
    New {
        /// Output file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Document title
        #[arg(long)]
        title: String,
        /// Document author
        #[arg(long)]
        author: String,
        /// Title of the root threat (default: document title)
        #[arg(long)]
        root_title: Option<String>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
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
    },

    /// Show config paths
    Path,
}
