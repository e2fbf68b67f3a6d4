//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Mirror a structural record tree with a synchronized node tree
#[derive(Parser, Debug)]
#[command(name = "treesync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the mirrored node tree
    Tree {
        /// Record document (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
    },

    /// List nodes in pre-order with sibling index
    Walk {
        /// Record document (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
    },

    /// List nodes whose kind carries every given trait
    Filter {
        /// Record document (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
        /// Required trait (repeatable)
        #[arg(short = 't', long = "trait", required = true)]
        traits: Vec<String>,
    },

    /// Build elements and print the outline
    Render {
        /// Record document (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
    },

    /// List configured node kinds
    Kinds {
        /// Directory holding a local .treesync.toml
        #[arg(short = 'C', long, value_hint = ValueHint::DirPath)]
        dir: Option<PathBuf>,
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
    /// Show effective configuration
    Show {
        /// Directory holding a local .treesync.toml
        #[arg(short = 'C', long, value_hint = ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },
    /// Print a commented config template
    Template,
    /// Show config file locations
    Path,
}
