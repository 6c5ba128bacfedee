//! engine
//!
//! Remote-facing work: bounded concurrency and the push orchestrator.
//!
//! # Architecture
//!
//! Commands build a [`Services`] bundle once and hand it to the engine. The
//! engine never opens repositories, reads configuration files, or picks a
//! forge itself, so tests can drive it with [`crate::git::MockGit`] and
//! [`crate::forge::mock::MockForge`].
//!
//! # Modules
//!
//! - [`concurrent`]: bounded-parallelism map/for-each with fail-fast
//!   cancellation
//! - [`push`]: the phased push orchestrator
//!
//! # Example
//!
//! ```ignore
//! use git_stack::engine::{push::push_stack, Services};
//!
//! let services = Services { git, forge, config };
//! let stack = inference.current(&head)?;
//! for pr in push_stack(&services, &cancel, stack, &default_branch).await? {
//!     println!("Pushed {}: {}", pr.head, pr.url);
//! }
//! ```

pub mod concurrent;
pub mod push;

use std::sync::Arc;

use crate::core::config::Config;
use crate::forge::Forge;
use crate::git::GitRepo;

pub use concurrent::{Cancelled, Executor};
pub use push::{push_stack, PushError};

/// Collaborators passed explicitly to every command.
#[derive(Clone)]
pub struct Services {
    pub git: Arc<dyn GitRepo>,
    pub forge: Arc<dyn Forge>,
    pub config: Config,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("forge", &self.forge.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
