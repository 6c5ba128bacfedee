//! cli::commands::push
//!
//! Push the current stack and sync its pull requests.
//!
//! # Design
//!
//! The command:
//! - Infers stacks and picks the one holding HEAD
//! - Resolves the forge from the push remote's URL (or the `forge` config)
//! - Reads the token from the environment
//! - Runs [`crate::engine::push_stack`] with Ctrl-C wired to cancellation
//! - Prints one `Pushed <branch>: <url>` line per pull request
//!
//! # Example
//!
//! ```bash
//! GITLAB_TOKEN=glpat-... git stack push
//! ```

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{open_workspace, Context, Workspace};
use crate::core::stack::Inference;
use crate::engine::{push_stack, Services};
use crate::forge::{create_forge, resolve_provider, token_from_env, TOKEN_ENV_FALLBACK};
use crate::git::GitRepo;
use crate::ui::output::{format_pushed, print};

/// Run the push command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn push(ctx: &Context) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(push_async(ctx))
}

/// Async implementation of push.
async fn push_async(ctx: &Context) -> Result<()> {
    let Workspace {
        git,
        config,
        default_branch,
    } = open_workspace(ctx)?;

    let head = git.commit_hash("HEAD")?;
    let inference = Inference::from_repo(&git, &default_branch)?;
    let stack = inference.current(&head)?.clone();
    debug!(stack = %stack.name(), branches = stack.len(), "pushing current stack");

    let remote_url = git
        .remote_url(git.remote())?
        .with_context(|| format!("remote '{}' is not configured", git.remote()))?;
    let provider = resolve_provider(&remote_url, config.forge())?;
    let Some(token) = token_from_env(provider) else {
        bail!(
            "no {} token found; set {} or {}",
            provider,
            provider.token_env(),
            TOKEN_ENV_FALLBACK
        );
    };
    let forge = create_forge(&remote_url, &token, Some(provider.name()), config.api_base())?;

    let services = Services {
        git: Arc::new(git),
        forge: Arc::from(forge),
        config,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after in-flight requests");
            on_interrupt.cancel();
        }
    });

    let result = push_stack(&services, &cancel, &stack, &default_branch).await;
    signal_task.abort();

    for pr in result? {
        print(format_pushed(&pr.head, &pr.url), ctx.verbosity);
    }
    Ok(())
}
