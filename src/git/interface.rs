//! git::interface
//!
//! Git interface implementation using git2.
//!
//! Reads (refs, commit log, HEAD) go through `git2`. Pushing shells out to
//! the `git` CLI so the user's credential helpers, SSH agent and push hooks
//! apply unchanged.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested revision does not exist
//! - [`GitError::PushRejected`]: The remote refused a push
//!
//! # Example
//!
//! ```ignore
//! use git_stack::git::{Git, GitRepo};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."), "origin")?;
//! let head = git.commit_hash("HEAD")?;
//! println!("HEAD is at {}", head.short(7));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::stack::{Branch, CommitLog, LogEntry};
use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested revision does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The revision that was not found
        refname: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid branch name.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// The remote rejected a push, or the git CLI failed.
    #[error("failed to push '{branch}': {message}")]
    PushRejected {
        /// The branch being pushed
        branch: BranchName,
        /// stderr of the failed push
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch => GitError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidBranchName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// Repository capabilities the stack engine needs.
///
/// Implementations must be shareable across tasks: pushes for different
/// branches run concurrently.
#[async_trait]
pub trait GitRepo: Send + Sync {
    /// Resolve `rev` (e.g. `HEAD`) to a full commit hash.
    fn commit_hash(&self, rev: &str) -> Result<Oid, GitError>;

    /// Every commit reachable from a local branch or HEAD but not from
    /// `default_branch`, plus the default branch tip, with branch refs.
    fn log_all(&self, default_branch: &BranchName) -> Result<CommitLog, GitError>;

    /// Force-push `branch` to the remote, refusing to clobber unseen work.
    async fn push_force_with_lease(&self, branch: &BranchName) -> Result<(), GitError>;
}

/// The Git interface backed by a real repository.
pub struct Git {
    /// The underlying git2 repository; not `Sync`, so access is serialized
    repo: Mutex<git2::Repository>,
    git_dir: PathBuf,
    work_dir: PathBuf,
    remote: String,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.git_dir)
            .field("remote", &self.remote)
            .finish()
    }
}

impl Git {
    /// Open a repository at the given path, pushing to `remote`.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path, remote: impl Into<String>) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();
        let git_dir = repo.path().to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            git_dir,
            work_dir,
            remote: remote.into(),
        })
    }

    /// Replace the remote pushes go to.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Path to the .git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Path to the working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The remote pushes go to.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn lock(&self) -> Result<MutexGuard<'_, git2::Repository>, GitError> {
        self.repo.lock().map_err(|_| GitError::Internal {
            message: "repository handle poisoned by a panicked task".to_string(),
        })
    }

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        let repo = self.lock()?;
        let result = match repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, name)),
        };
        result
    }

    /// List all local branches with their tips.
    ///
    /// Branches whose names fail validation are skipped.
    pub fn list_branches(&self) -> Result<Vec<Branch>, GitError> {
        let repo = self.lock()?;
        Self::branches_in(&repo)
    }

    fn branches_in(repo: &git2::Repository) -> Result<Vec<Branch>, GitError> {
        let mut branches = Vec::new();
        for entry in repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name().ok().flatten() else {
                continue;
            };
            let Ok(name) = BranchName::new(name) else {
                debug!(branch = name, "skipping branch with invalid name");
                continue;
            };
            let commit = branch
                .get()
                .peel_to_commit()
                .map_err(|e| GitError::from_git2(e, name.as_str()))?;
            branches.push(Branch {
                name,
                tip: Oid::new(commit.id().to_string())?,
            });
        }
        Ok(branches)
    }

    /// Pick a default branch: `main` if it exists locally, then `master`.
    pub fn detect_default_branch(&self) -> Result<Option<BranchName>, GitError> {
        let repo = self.lock()?;
        for candidate in ["main", "master"] {
            if repo
                .find_branch(candidate, git2::BranchType::Local)
                .is_ok()
            {
                return Ok(Some(BranchName::new(candidate)?));
            }
        }
        Ok(None)
    }
}

fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

#[async_trait]
impl GitRepo for Git {
    fn commit_hash(&self, rev: &str) -> Result<Oid, GitError> {
        let repo = self.lock()?;
        let commit = repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, rev))?;
        to_oid(commit.id())
    }

    fn log_all(&self, default_branch: &BranchName) -> Result<CommitLog, GitError> {
        let repo = self.lock()?;
        let branches = Self::branches_in(&repo)?;

        let default_tip = branches
            .iter()
            .find(|b| &b.name == default_branch)
            .map(|b| b.tip.clone());

        let mut walk = repo.revwalk()?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL)?;
        for branch in &branches {
            walk.push(git2::Oid::from_str(branch.tip.as_str())?)?;
        }
        if let Ok(head) = repo.head().and_then(|h| h.peel_to_commit()) {
            walk.push(head.id())?;
        }
        if let Some(tip) = &default_tip {
            walk.hide(git2::Oid::from_str(tip.as_str())?)?;
        }

        let mut at_commit: HashMap<&Oid, Vec<BranchName>> = HashMap::new();
        for branch in &branches {
            at_commit
                .entry(&branch.tip)
                .or_default()
                .push(branch.name.clone());
        }

        let mut entry_for = |oid: git2::Oid| -> Result<LogEntry, GitError> {
            let commit = repo
                .find_commit(oid)
                .map_err(|e| GitError::from_git2(e, &oid.to_string()))?;
            let oid = to_oid(oid)?;
            let parents = commit
                .parent_ids()
                .map(to_oid)
                .collect::<Result<Vec<_>, _>>()?;
            let branches = at_commit.remove(&oid).unwrap_or_default();
            Ok(LogEntry {
                oid,
                parents,
                branches,
            })
        };

        let mut entries = Vec::new();
        for oid in walk {
            entries.push(entry_for(oid?)?);
        }
        if let Some(tip) = &default_tip {
            entries.push(entry_for(git2::Oid::from_str(tip.as_str())?)?);
        }

        debug!(
            commits = entries.len(),
            branches = branches.len(),
            "read commit log"
        );

        Ok(CommitLog {
            default_branch: default_branch.clone(),
            default_tip,
            entries,
            branches,
        })
    }

    async fn push_force_with_lease(&self, branch: &BranchName) -> Result<(), GitError> {
        info!(branch = %branch, remote = %self.remote, "pushing");
        let output = tokio::process::Command::new("git")
            .arg("-C")
            .arg(&self.work_dir)
            .args(["push", "--force-with-lease", &self.remote, branch.as_str()])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GitError::PushRejected {
                branch: branch.clone(),
                message: format!("failed to run git: {e}"),
            })?;

        if !output.status.success() {
            return Err(GitError::PushRejected {
                branch: branch.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = GitError::RefNotFound {
                refname: "HEAD".to_string(),
            };
            assert_eq!(err.to_string(), "ref not found: HEAD");

            let err = GitError::PushRejected {
                branch: BranchName::new("feature").unwrap(),
                message: "stale info".to_string(),
            };
            assert_eq!(err.to_string(), "failed to push 'feature': stale info");
        }

        #[test]
        fn type_errors_convert() {
            let err: GitError = TypeError::InvalidOid("xyz".to_string()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));

            let err: GitError = TypeError::InvalidBranchName("a..b".to_string()).into();
            assert!(matches!(err, GitError::InvalidRefName { .. }));
        }
    }

    mod open {
        use super::*;

        #[test]
        fn outside_repository_fails() {
            let temp = tempfile::TempDir::new().unwrap();
            let err = Git::open(temp.path(), "origin").unwrap_err();
            assert!(matches!(err, GitError::NotARepo { .. }));
        }

        #[test]
        fn bare_repository_rejected() {
            let temp = tempfile::TempDir::new().unwrap();
            git2::Repository::init_bare(temp.path()).unwrap();
            let err = Git::open(temp.path(), "origin").unwrap_err();
            assert!(matches!(err, GitError::BareRepo));
        }

        #[test]
        fn fresh_repository_has_no_branches() {
            let temp = tempfile::TempDir::new().unwrap();
            git2::Repository::init(temp.path()).unwrap();
            let git = Git::open(temp.path(), "origin").unwrap();

            assert!(git.list_branches().unwrap().is_empty());
            assert!(git.detect_default_branch().unwrap().is_none());
            assert!(matches!(
                git.commit_hash("HEAD"),
                Err(GitError::RefNotFound { .. })
            ));
            assert_eq!(git.remote_url("origin").unwrap(), None);
        }
    }
}
