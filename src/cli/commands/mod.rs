//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository and loads configuration
//! 2. Infers stacks, calling the engine for remote work
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `push` involves network I/O, so it builds a tokio runtime and blocks on
//! the async implementation. `list` and `version` stay synchronous.

mod list;
mod push;
mod version;

pub use list::list;
pub use push::push;
pub use version::version;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cli::args::Command;
use crate::core::config::Config;
use crate::core::types::BranchName;
use crate::git::Git;
use crate::ui::output::Verbosity;

/// Per-invocation settings taken from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory to run in; the process working directory when `None`
    pub cwd: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Context {
    fn cwd(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir().context("failed to read current directory"),
        }
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::List => list::list(ctx),
        Command::Push => push::push(ctx),
        Command::Version => version::version(),
    }
}

/// An opened repository with its configuration resolved.
struct Workspace {
    git: Git,
    config: Config,
    default_branch: BranchName,
}

/// Open the repository at the context's directory and resolve the default
/// branch: configured value first, then `main`, then `master`.
fn open_workspace(ctx: &Context) -> Result<Workspace> {
    let cwd = ctx.cwd()?;
    let git = Git::open(&cwd, "origin")?;
    let config = Config::load(Some(git.git_dir()))?;
    let git = git.with_remote(config.remote());

    let default_branch = match config.default_branch() {
        Some(branch) => branch,
        None => git.detect_default_branch()?.context(
            "could not find a default branch (tried 'main' and 'master'); \
             set default_branch in .git/git-stack/config.toml",
        )?,
    };
    tracing::debug!(%default_branch, remote = git.remote(), "opened repository");

    Ok(Workspace {
        git,
        config,
        default_branch,
    })
}
