//! forge::traits
//!
//! The seam between the push engine and a hosting service.
//!
//! Every call is async network I/O. An absent pull request comes back as
//! [`ForgeError::NotFound`], which is the only error the engine recovers
//! from (by creating one).
//!
//! ```ignore
//! use git_stack::forge::{CreatePrRequest, Forge, ForgeError};
//!
//! async fn open_or_find(forge: &dyn Forge, head: &str) -> Result<String, ForgeError> {
//!     let pr = match forge.get_pr_by_head(head).await {
//!         Err(ForgeError::NotFound(_)) => {
//!             let request = CreatePrRequest {
//!                 head: head.into(),
//!                 base: "main".into(),
//!                 title: head.into(),
//!                 body: String::new(),
//!             };
//!             forge.create_pr(request).await?
//!         }
//!         found => found?,
//!     };
//!     Ok(pr.url)
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

/// Ways a forge call can fail.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// No token was configured.
    #[error("authentication required")]
    AuthRequired,

    /// The forge refused the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,

    /// Any other non-success HTTP status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// The request never got a response.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Fields for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// Source branch.
    pub head: String,
    /// Target branch.
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Partial edit of a pull request; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePrRequest {
    pub number: u64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub base: Option<String>,
}

/// A pull request (GitLab: merge request) as the forge reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Per-repository number; the `iid` on GitLab.
    pub number: u64,
    /// Browser URL.
    pub url: String,
    /// Short reference that renders as a link, `!12` or `#12`.
    pub markdown_url: String,
    pub head: String,
    pub base: String,
    pub title: String,
    /// Description, empty when unset.
    pub body: String,
}

/// A hosting service that stores pull requests.
///
/// Shared across tasks by the push engine, hence `Send + Sync`.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Short provider id such as `"gitlab"`.
    fn name(&self) -> &'static str;

    /// The open pull request whose source branch is `head`, or
    /// [`ForgeError::NotFound`].
    async fn get_pr_by_head(&self, head: &str) -> Result<PullRequest, ForgeError>;

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;

    /// Apply the `Some` fields of `request` and return the result.
    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError>;
}
