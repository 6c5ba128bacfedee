//! engine::push
//!
//! The sync orchestrator: make the remote forge mirror a local stack.
//!
//! # Phases
//!
//! Each phase runs concurrently across the stack's branches and completes
//! before the next one starts:
//!
//! 1. **Reconcile**: find the open PR for every branch, creating it when
//!    missing and retargeting it when its base is not the desired target.
//! 2. **Push**: force-push every branch with lease.
//! 3. **Republish**: rewrite every PR description with the stack listing
//!    built from the phase 1 PRs, and set the desired target again.
//! 4. **Return** the final PRs in stack order, tip first.
//!
//! The first failure aborts the push. Nothing is rolled back: PRs created
//! or branches pushed before the failure stay as they are, and the next
//! push picks up from there.

use std::collections::HashMap;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::concurrent::{Cancelled, Executor};
use super::Services;
use crate::core::stack::{Stack, StackError};
use crate::core::types::BranchName;
use crate::forge::{CreatePrRequest, ForgeError, PullRequest, UpdatePrRequest};
use crate::git::GitError;
use crate::ui::stack_description::format_description;

/// Errors from pushing a stack.
#[derive(Debug, Error)]
pub enum PushError {
    /// The stack's branch order is ambiguous.
    #[error("cannot push when stack has an error: {0}")]
    InvalidStack(StackError),

    /// A forge call failed for one branch.
    #[error("failed to sync pull request for '{branch}': {source}")]
    Forge {
        branch: BranchName,
        #[source]
        source: ForgeError,
    },

    /// Pushing one branch failed.
    #[error("failed to push '{branch}': {source}")]
    Push {
        branch: BranchName,
        #[source]
        source: GitError,
    },

    /// The push was interrupted.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl PushError {
    /// The branch the failure is about, if any.
    pub fn branch(&self) -> Option<&BranchName> {
        match self {
            PushError::Forge { branch, .. } | PushError::Push { branch, .. } => Some(branch),
            PushError::InvalidStack(_) | PushError::Cancelled(_) => None,
        }
    }
}

/// Push `stack` and sync its pull requests.
///
/// Returns the PRs in stack order, tip first, as they stand after the final
/// update.
///
/// # Errors
///
/// - [`PushError::InvalidStack`] before any remote call if the stack has an
///   ordering error
/// - [`PushError::Forge`] / [`PushError::Push`] naming the failing branch
/// - [`PushError::Cancelled`] if `cancel` fires first
pub async fn push_stack(
    services: &Services,
    cancel: &CancellationToken,
    stack: &Stack,
    default_branch: &BranchName,
) -> Result<Vec<PullRequest>, PushError> {
    if let Some(err) = stack.error() {
        return Err(PushError::InvalidStack(err.clone()));
    }

    let branches: Vec<BranchName> = stack
        .local_branches()
        .iter()
        .map(|b| b.name.clone())
        .collect();
    let targets = stack.desired_targets(default_branch);
    let executor = Executor::new(services.config.concurrency(), cancel.clone());

    info!(stack = %stack.name(), branches = branches.len(), "reconciling pull requests");
    let prs = executor
        .map(branches.clone(), |branch| {
            let target = target_of(&targets, &branch, default_branch);
            async move {
                let result = reconcile(services, &branch, target).await;
                result.map_err(|source| PushError::Forge { branch, source })
            }
        })
        .await?;

    info!(stack = %stack.name(), "pushing branches");
    executor
        .for_each(branches.clone(), |branch| async move {
            debug!(%branch, "force-pushing with lease");
            let result = services.git.push_force_with_lease(&branch).await;
            result.map_err(|source| PushError::Push { branch, source })
        })
        .await?;

    info!(stack = %stack.name(), "updating descriptions");
    let prs_ref = &prs;
    let updated = executor
        .map(branches.into_iter().zip(prs.iter()).collect(), |(branch, pr)| {
            let target = target_of(&targets, &branch, default_branch);
            async move {
                let request = UpdatePrRequest {
                    number: pr.number,
                    title: None,
                    body: Some(format_description(pr, prs_ref)),
                    base: Some(target.to_string()),
                };
                debug!(%branch, number = pr.number, "republishing description");
                services
                    .forge
                    .update_pr(request)
                    .await
                    .map_err(|source| PushError::Forge { branch, source })
            }
        })
        .await?;

    Ok(updated)
}

fn target_of<'a>(
    targets: &'a HashMap<BranchName, BranchName>,
    branch: &BranchName,
    default_branch: &'a BranchName,
) -> &'a BranchName {
    targets.get(branch).unwrap_or(default_branch)
}

/// Find or create the PR for `branch`, retargeting it onto `target`.
async fn reconcile(
    services: &Services,
    branch: &BranchName,
    target: &BranchName,
) -> Result<PullRequest, ForgeError> {
    let forge = &services.forge;
    match forge.get_pr_by_head(branch.as_str()).await {
        Ok(pr) if pr.base == target.as_str() => {
            debug!(%branch, number = pr.number, "pull request up to date");
            Ok(pr)
        }
        Ok(pr) => {
            info!(%branch, number = pr.number, from = %pr.base, to = %target, "retargeting pull request");
            forge
                .update_pr(UpdatePrRequest {
                    number: pr.number,
                    base: Some(target.to_string()),
                    ..Default::default()
                })
                .await
        }
        Err(ForgeError::NotFound(_)) => {
            info!(%branch, %target, "creating pull request");
            forge
                .create_pr(CreatePrRequest {
                    head: branch.to_string(),
                    base: target.to_string(),
                    title: branch.to_string(),
                    body: String::new(),
                })
                .await
        }
        Err(err) => Err(err),
    }
}
