//! core::stack
//!
//! The stack model: what the inference engine produces and every command
//! consumes.
//!
//! # Model
//!
//! - [`CommitLog`] is the raw input: commits beyond the default branch,
//!   annotated with the local branches pointing at them.
//! - [`Stack`] is an ordered chain of [`Branch`]es, tip first, base last.
//! - [`Inference`] is the outcome of one inference run: every stack plus a
//!   flattened list of [`Problem`]s.
//!
//! # Invariants
//!
//! - Every local branch other than the default branch is in exactly one stack
//! - A stack without errors is a total order: `branches[i + 1]` is the nearest
//!   ancestor branch of `branches[i]`, and the last branch targets the default
//!   branch
//! - A stack with errors still carries its best-effort branch list

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::types::{BranchName, Oid};

/// A single commit from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Commit hash
    pub oid: Oid,
    /// Parent hashes (more than one for merge commits)
    pub parents: Vec<Oid>,
    /// Local branches whose tip is this commit
    pub branches: Vec<BranchName>,
}

/// Raw input to stack inference.
///
/// `entries` holds every commit reachable from a local branch (or HEAD) that
/// is not reachable from the default branch, plus the default branch tip.
/// Any commit not present in `entries` belongs to the default branch history.
#[derive(Debug, Clone)]
pub struct CommitLog {
    /// The trunk branch stacks are computed against
    pub default_branch: BranchName,
    /// Tip of the default branch, if it exists locally
    pub default_tip: Option<Oid>,
    /// Commits, newest first
    pub entries: Vec<LogEntry>,
    /// Every local branch with its tip
    pub branches: Vec<Branch>,
}

/// A local branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch {
    pub name: BranchName,
    pub tip: Oid,
}

/// Why a stack's ordering could not be determined.
///
/// These are carried on the affected [`Stack`] and never abort inference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A merge commit joins histories that lead to different branches.
    #[error("branch '{branch}' merges the histories of {}, cannot pick a parent", join(.candidates))]
    AmbiguousMerge {
        branch: BranchName,
        candidates: Vec<BranchName>,
    },

    /// Several branches point at the same commit.
    #[error("branches {} point at the same commit {}", join(.branches), .commit.short(7))]
    SharedTip {
        branches: Vec<BranchName>,
        commit: Oid,
    },

    /// Branches build on a common base without being ancestors of each other.
    #[error("branches {} have diverged from a shared history", join(.branches))]
    Diverged { branches: Vec<BranchName> },

    /// The branch history never meets the default branch.
    #[error("branch '{branch}' is not reachable from '{default_branch}'")]
    Unreachable {
        branch: BranchName,
        default_branch: BranchName,
    },
}

fn join(names: &[BranchName]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from reading or querying an inference.
#[derive(Debug, Error)]
pub enum InferError {
    /// HEAD is not on any commit owned by a stack.
    #[error("no stack contains commit {0}; check out a stacked branch first")]
    NotFound(Oid),

    /// The commit log could not be read.
    #[error("failed to read commit log: {0}")]
    Log(#[from] crate::git::GitError),
}

/// An ordered chain of branches, tip first.
#[derive(Debug, Clone)]
pub struct Stack {
    /// Tip to base
    branches: Vec<Branch>,
    /// Every commit owned by a branch in the stack, tips included
    commits: HashSet<Oid>,
    /// Empty when the ordering is unambiguous
    errors: Vec<StackError>,
}

impl Stack {
    /// Build a stack from branches already ordered tip to base.
    pub fn new(branches: Vec<Branch>, commits: HashSet<Oid>, errors: Vec<StackError>) -> Self {
        debug_assert!(!branches.is_empty(), "a stack holds at least one branch");
        Self {
            branches,
            commits,
            errors,
        }
    }

    /// Display name: the tip for a single branch, `base..tip` otherwise.
    pub fn name(&self) -> String {
        let tip = &self.branches[0].name;
        match self.branches.last() {
            Some(base) if base.name != *tip => format!("{}..{}", base.name, tip),
            _ => tip.to_string(),
        }
    }

    /// Branches from tip to base.
    pub fn local_branches(&self) -> &[Branch] {
        &self.branches
    }

    /// The stack's branch names, for callers that only need membership.
    pub fn all_branches(&self) -> HashSet<&BranchName> {
        self.branches.iter().map(|b| &b.name).collect()
    }

    /// Number of branches in the stack.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Whether the stack holds no branches (never true for inferred stacks).
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// The first ordering problem, if any.
    pub fn error(&self) -> Option<&StackError> {
        self.errors.first()
    }

    /// Every ordering problem.
    pub fn errors(&self) -> &[StackError] {
        &self.errors
    }

    /// Whether `commit` is a branch tip in this stack or lies underneath one
    /// before the default branch is reached.
    pub fn is_current(&self, commit: &Oid) -> bool {
        self.commits.contains(commit) || self.branches.iter().any(|b| &b.tip == commit)
    }

    /// The target each branch's pull request should merge into.
    ///
    /// Every branch targets the next one toward the base; the base targets
    /// `default_branch`.
    pub fn desired_targets(&self, default_branch: &BranchName) -> HashMap<BranchName, BranchName> {
        self.branches
            .iter()
            .enumerate()
            .map(|(i, branch)| {
                let target = self
                    .branches
                    .get(i + 1)
                    .map_or_else(|| default_branch.clone(), |next| next.name.clone());
                (branch.name.clone(), target)
            })
            .collect()
    }
}

/// A human-readable inference anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// The affected stack, `None` for repository-wide anomalies
    pub stack: Option<String>,
    /// What went wrong
    pub message: String,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.stack {
            Some(stack) => write!(f, "{stack}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of one inference run.
#[derive(Debug, Clone, Default)]
pub struct Inference {
    /// Every stack, sorted by name
    pub stacks: Vec<Stack>,
    /// Every stack error plus global anomalies
    pub problems: Vec<Problem>,
}

impl Inference {
    /// Find the stack holding `commit`, typically HEAD.
    ///
    /// # Errors
    ///
    /// [`InferError::NotFound`] when no stack owns the commit, e.g. a detached
    /// HEAD on trunk history.
    pub fn current(&self, commit: &Oid) -> Result<&Stack, InferError> {
        self.stacks
            .iter()
            .find(|s| s.is_current(commit))
            .ok_or_else(|| InferError::NotFound(commit.clone()))
    }
}
