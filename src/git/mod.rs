//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! Everything the stack engine needs from a repository goes through the
//! [`GitRepo`] trait: resolving HEAD, reading the commit log with branch refs,
//! and force-pushing. No other module imports `git2`.
//!
//! - [`Git`] is the real implementation (`git2` for reads, the `git` CLI for
//!   pushes).
//! - [`MockGit`] serves a fixed log for tests.
//!
//! # Invariants
//!
//! - All operations return strong types (Oid, BranchName)
//! - Commit hashes are always full length
//!
//! # Example
//!
//! ```ignore
//! use git_stack::git::{Git, GitRepo};
//! use git_stack::core::types::BranchName;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."), "origin")?;
//! let log = git.log_all(&BranchName::new("main")?)?;
//! println!("{} commits beyond main", log.entries.len());
//! ```

mod interface;
mod mock;

pub use interface::{Git, GitError, GitRepo};
pub use mock::MockGit;
