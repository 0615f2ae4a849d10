//! Handles all user-facing output for the CLI.
//!
//! Trees are printed as JSON on stdout. Round-trip reports go to stdout with
//! colored line diffs between the original node and what the reverse rule
//! rebuilt.

use std::io::Write;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::node::Node;
use crate::transformer::{strip_fields, RoundTrip, RoundTripOutcome, RuleTable};
use crate::uast::type_of;

// ============================================================================
// TREES AND TABLES
// ============================================================================

pub fn print_tree(tree: &Node, compact: bool) {
    if compact {
        println!("{}", tree.to_json_string());
    } else {
        println!("{}", tree.to_json_pretty());
    }
}

pub fn print_tables(tables: &[&RuleTable]) {
    let mut stdout = color_stdout();
    for table in tables {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = writeln!(stdout, "{} ({} rules)", table.name(), table.len());
        let _ = stdout.reset();
        for (i, label) in table.labels().enumerate() {
            let _ = writeln!(stdout, "  {:>2}. {}", i + 1, label);
        }
    }
}

// ============================================================================
// ROUND TRIP REPORTS
// ============================================================================

/// Prints one line per rewrite (or only the failing ones) and a summary.
/// Returns the number of rewrites that did not round-trip exactly.
pub fn print_round_trips(reports: &[RoundTrip], verbose: bool) -> usize {
    let mut stdout = color_stdout();
    let mut failures = 0;
    for report in reports {
        let node_type = type_of(&report.original).unwrap_or("?");
        match &report.outcome {
            RoundTripOutcome::Exact => {
                if verbose {
                    status(&mut stdout, Color::Green, "OK");
                    let _ = writeln!(stdout, " {} [{}]", report.label, node_type);
                }
            }
            RoundTripOutcome::Differs { restored } => {
                failures += 1;
                status(&mut stdout, Color::Red, "DIFF");
                let _ = writeln!(stdout, " {} [{}]", report.label, node_type);
                let before = strip_fields(&report.original, &report.ignored).to_json_pretty();
                let after = strip_fields(restored, &report.ignored).to_json_pretty();
                let changeset = Changeset::new(&before, &after, "\n");
                print_diff(&mut stdout, &changeset.diffs);
            }
            RoundTripOutcome::NotReversible { reason } => {
                failures += 1;
                status(&mut stdout, Color::Yellow, "IRREVERSIBLE");
                let _ = writeln!(stdout, " {} [{}]: {}", report.label, node_type, reason);
            }
        }
    }
    let _ = writeln!(
        stdout,
        "\n{} rewrites, {} exact, {} not reversible",
        reports.len(),
        reports.len() - failures,
        failures
    );
    failures
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

/// Colors only when stdout is a terminal.
fn color_stdout() -> StandardStream {
    let choice = if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn status(stdout: &mut StandardStream, color: Color, text: &str) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stdout, "{}", text);
    let _ = stdout.reset();
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        let (color, sign, text) = match diff {
            Difference::Same(x) => (None, ' ', x),
            Difference::Add(x) => (Some(Color::Green), '+', x),
            Difference::Rem(x) => (Some(Color::Red), '-', x),
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(color));
        for line in text.lines() {
            let _ = writeln!(stdout, "{}{}", sign, line);
        }
    }
    let _ = stdout.reset();
}
