//! git-stack - infer stacked branches from history and sync them as linked
//! pull requests
//!
//! Stacks are never recorded anywhere: every command reconstructs them from
//! commit ancestry, so ordinary git operations (rebase, reset, branch
//! deletion) can never leave git-stack out of date.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`core`] - Domain types, configuration and stack inference
//! - [`git`] - Single interface for all Git operations
//! - [`forge`] - Abstraction for remote forges (GitLab, GitHub)
//! - [`engine`] - Bounded concurrency and the push orchestrator
//! - [`ui`] - Terminal output and PR description formatting
//!
//! # Guarantees
//!
//! 1. Every local branch other than the default branch lands in exactly one
//!    stack, even when its order cannot be determined
//! 2. A stack with an ordering problem is never pushed
//! 3. Regenerating a PR description never touches text outside the
//!    generated section

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod ui;
