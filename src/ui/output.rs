//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Command results go to stdout and respect the quiet flag. Diagnostics go
//! through `tracing` to stderr instead.

use std::fmt::Display;

use crate::core::stack::{Problem, Stack};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose logging
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. Quiet wins.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// One `list` line: `* name (N branches)` for the current stack, two
/// spaces instead of the star otherwise.
pub fn format_stack_line(stack: &Stack, is_current: bool) -> String {
    let marker = if is_current { "* " } else { "  " };
    let count = stack.len();
    let noun = if count == 1 { "branch" } else { "branches" };
    format!("{}{} ({} {})", marker, stack.name(), count, noun)
}

/// The "Problems" block printed after the stack list; empty when there are
/// none.
pub fn format_problems(problems: &[Problem]) -> String {
    if problems.is_empty() {
        return String::new();
    }
    let mut out = String::from("Problems:");
    for problem in problems {
        out.push_str("\n  - ");
        out.push_str(&problem.to_string());
    }
    out
}

/// One `push` line.
pub fn format_pushed(head: &str, url: &str) -> String {
    format!("Pushed {}: {}", head, url)
}
