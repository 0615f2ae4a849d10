//! The uastify Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::io::Read;
use std::path::Path;
use std::{fs, io, process};

use clap::Parser;

use crate::cli::args::{Command, UastifyArgs};
use crate::config::DriverConfig;
use crate::diagnostics::{to_error_source, Span, UastError};
use crate::node::Node;
use crate::normalizer::{Mode, Transforms};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = UastifyArgs::parse();

    let result = load_config(args.config.as_deref()).and_then(|config| {
        // Dispatch to the appropriate subcommand handler.
        match args.command {
            Command::Normalize {
                file,
                source,
                mode,
                compact,
            } => handle_normalize(&config, &file, source.as_deref(), mode, compact),
            Command::Roundtrip { file, verbose } => handle_roundtrip(&config, &file, verbose),
            Command::Rules => {
                let transforms = Transforms::new(&config);
                output::print_tables(&transforms.tables());
                Ok(true)
            }
        }
    });

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            let report = miette::Report::new(e);
            eprintln!("{report:?}");
            process::exit(1);
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_normalize(
    config: &DriverConfig,
    file: &Path,
    source: Option<&Path>,
    mode: Option<Mode>,
    compact: bool,
) -> Result<bool, UastError> {
    let tree = read_tree(file)?;
    let source = source.map(read_text).transpose()?;
    let mode = mode.unwrap_or(config.mode);
    let transforms = Transforms::new(config);
    let out = transforms.run(tree, source.as_deref(), mode)?;
    output::print_tree(&out, compact);
    Ok(true)
}

/// Succeeds only if every rewrite came back unchanged.
fn handle_roundtrip(config: &DriverConfig, file: &Path, verbose: bool) -> Result<bool, UastError> {
    let tree = read_tree(file)?;
    let transforms = Transforms::new(config);
    let (_, reports) = transforms.round_trip(tree)?;
    let failures = output::print_round_trips(&reports, verbose);
    Ok(failures == 0)
}

// ============================================================================
// INPUT
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<DriverConfig, UastError> {
    match path {
        Some(path) => DriverConfig::from_file(path),
        None => Ok(DriverConfig::default()),
    }
}

fn read_text(path: &Path) -> Result<String, UastError> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| UastError::from(e).context("reading stdin"))?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|e| UastError::from(e).context(format!("reading {}", path.display())))
}

fn read_tree(path: &Path) -> Result<Node, UastError> {
    let text = read_text(path)?;
    Node::from_json_str(&text).map_err(|e| json_error(path, &text, &e))
}

/// Points the diagnostic at the byte where `serde_json` gave up.
fn json_error(path: &Path, text: &str, err: &serde_json::Error) -> UastError {
    let name = path.display().to_string();
    // Line 0 means the error has no position in the input.
    if err.line() == 0 || text.is_empty() {
        return crate::err_msg!(MalformedTree, "{} is not a valid parser response: {}", name, err);
    }
    let line_start: usize = text
        .split_inclusive('\n')
        .take(err.line() - 1)
        .map(str::len)
        .sum();
    let start = (line_start + err.column().saturating_sub(1)).min(text.len() - 1);
    let src = to_error_source(&name, text);
    crate::err_ctx!(
        MalformedTree,
        format!("{} is not a valid parser response: {}", name, err),
        &src,
        Span { start, end: start + 1 },
        "the input must be the JSON tree printed by the native parser"
    )
}
