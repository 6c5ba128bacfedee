//! git::mock
//!
//! In-memory [`GitRepo`] for deterministic testing.
//!
//! The mock serves a fixed [`CommitLog`] and HEAD, records every push, and
//! can be told to reject pushes of a particular branch.
//!
//! # Example
//!
//! ```
//! use git_stack::core::stack::CommitLog;
//! use git_stack::core::types::{BranchName, Oid};
//! use git_stack::git::{GitRepo, MockGit};
//!
//! # tokio_test::block_on(async {
//! let main = BranchName::new("main").unwrap();
//! let head = Oid::new("a".repeat(40)).unwrap();
//! let log = CommitLog {
//!     default_branch: main.clone(),
//!     default_tip: Some(head.clone()),
//!     entries: vec![],
//!     branches: vec![],
//! };
//!
//! let git = MockGit::new(log, head.clone());
//! assert_eq!(git.commit_hash("HEAD").unwrap(), head);
//!
//! let feature = BranchName::new("feature").unwrap();
//! git.push_force_with_lease(&feature).await.unwrap();
//! assert_eq!(git.pushed(), vec![feature]);
//! # });
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::interface::{GitError, GitRepo};
use crate::core::stack::CommitLog;
use crate::core::types::{BranchName, Oid};

/// Mock repository for testing.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the services under test.
#[derive(Debug, Clone)]
pub struct MockGit {
    inner: Arc<Mutex<MockGitInner>>,
}

#[derive(Debug)]
struct MockGitInner {
    log: CommitLog,
    head: Oid,
    /// Pushes of this branch are rejected
    reject_push: Option<BranchName>,
    /// Successful pushes, in completion order
    pushed: Vec<BranchName>,
}

impl MockGit {
    /// Create a mock serving `log`, with HEAD at `head`.
    pub fn new(log: CommitLog, head: Oid) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockGitInner {
                log,
                head,
                reject_push: None,
                pushed: Vec::new(),
            })),
        }
    }

    /// Reject every push of `branch`.
    pub fn reject_push(self, branch: BranchName) -> Self {
        self.state().reject_push = Some(branch);
        self
    }

    /// Move HEAD.
    pub fn set_head(&self, head: Oid) {
        self.state().head = head;
    }

    /// Branches pushed successfully so far.
    pub fn pushed(&self) -> Vec<BranchName> {
        self.state().pushed.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockGitInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl GitRepo for MockGit {
    fn commit_hash(&self, rev: &str) -> Result<Oid, GitError> {
        let state = self.state();
        if rev == "HEAD" {
            return Ok(state.head.clone());
        }
        state
            .log
            .branches
            .iter()
            .find(|b| b.name.as_str() == rev)
            .map(|b| b.tip.clone())
            .ok_or_else(|| GitError::RefNotFound {
                refname: rev.to_string(),
            })
    }

    fn log_all(&self, default_branch: &BranchName) -> Result<CommitLog, GitError> {
        let mut log = self.state().log.clone();
        log.default_branch = default_branch.clone();
        Ok(log)
    }

    async fn push_force_with_lease(&self, branch: &BranchName) -> Result<(), GitError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        if state.reject_push.as_ref() == Some(branch) {
            return Err(GitError::PushRejected {
                branch: branch.clone(),
                message: "stale info".to_string(),
            });
        }
        state.pushed.push(branch.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stack::Branch;

    fn oid(n: u32) -> Oid {
        Oid::new(format!("{n:040x}")).unwrap()
    }

    fn name(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    fn mock() -> MockGit {
        let log = CommitLog {
            default_branch: name("main"),
            default_tip: Some(oid(1)),
            entries: vec![],
            branches: vec![Branch {
                name: name("feature"),
                tip: oid(2),
            }],
        };
        MockGit::new(log, oid(2))
    }

    #[test]
    fn resolves_head_and_branches() {
        let git = mock();
        assert_eq!(git.commit_hash("HEAD").unwrap(), oid(2));
        assert_eq!(git.commit_hash("feature").unwrap(), oid(2));
        assert!(matches!(
            git.commit_hash("missing"),
            Err(GitError::RefNotFound { .. })
        ));

        git.set_head(oid(1));
        assert_eq!(git.commit_hash("HEAD").unwrap(), oid(1));
    }

    #[tokio::test]
    async fn rejected_push_is_not_recorded() {
        let git = mock().reject_push(name("bad"));

        git.push_force_with_lease(&name("good")).await.unwrap();
        let err = git.push_force_with_lease(&name("bad")).await.unwrap_err();

        assert!(matches!(err, GitError::PushRejected { .. }));
        assert_eq!(git.pushed(), vec![name("good")]);
    }
}
