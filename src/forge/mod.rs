//! forge
//!
//! Abstraction for remote forges (GitLab, GitHub).
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for interacting with remote
//! hosting services. Commands use the [`create_forge`] factory function
//! rather than importing specific forge implementations directly.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`gitlab`]: GitLab merge requests over REST v4
//! - [`github`]: GitHub pull requests over REST
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Remote URL parsing, forge selection and creation
//!
//! # Example
//!
//! ```ignore
//! use git_stack::forge::{create_forge, Forge};
//!
//! let forge = create_forge("git@gitlab.com:group/project.git", token, None, None)?;
//! let mr = forge.get_pr_by_head("feature").await?;
//! println!("{}: {}", mr.markdown_url, mr.url);
//! ```

mod factory;
pub mod github;
pub mod gitlab;
pub mod mock;
mod traits;

pub use factory::{
    create_forge, detect_provider, resolve_provider, token_from_env, valid_forge_names,
    ForgeProvider, RemoteRepo, TOKEN_ENV_FALLBACK,
};
pub use traits::*;
