//! Defines the command-line arguments and subcommands for the uastify CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::normalizer::Mode;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "uastify",
    version,
    about = "Normalizes native C++ parser trees into a language-agnostic Universal AST."
)]
pub struct UastifyArgs {
    /// Driver configuration file (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the driver pipeline over a native parser response and print the result.
    Normalize {
        /// Native parser response (JSON), or `-` for stdin.
        #[arg(required = true)]
        file: PathBuf,
        /// Original source text, used to resolve lines and columns.
        #[arg(long)]
        source: Option<PathBuf>,
        /// How far to run the pipeline. Overrides the configuration.
        #[arg(long, value_enum)]
        mode: Option<Mode>,
        /// Print the tree on one line.
        #[arg(long)]
        compact: bool,
    },
    /// Apply every semantic rule forward and in reverse, and report nodes
    /// that do not come back unchanged.
    Roundtrip {
        /// Native parser response (JSON), or `-` for stdin.
        #[arg(required = true)]
        file: PathBuf,
        /// Also list rewrites that round-trip exactly.
        #[arg(long)]
        verbose: bool,
    },
    /// List every rule table and its rules in order.
    Rules,
}
