//! forge::gitlab
//!
//! GitLab forge implementation using the REST v4 merge request API.
//!
//! # Design
//!
//! GitLab calls pull requests "merge requests" and numbers them per project
//! with an `iid`; [`PullRequest::number`] carries that iid. Projects are
//! addressed by their URL-encoded full path, so nested groups work without a
//! project id lookup.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `get_pr_by_head` | `GET /projects/:path/merge_requests?source_branch=:head&state=opened` |
//! | `create_pr` | `POST /projects/:path/merge_requests` |
//! | `update_pr` | `PUT /projects/:path/merge_requests/:iid` |
//!
//! # Authentication
//!
//! A personal, project or group access token sent as `PRIVATE-TOKEN`.
//!
//! # Example
//!
//! ```ignore
//! use git_stack::forge::gitlab::GitLabForge;
//! use git_stack::forge::Forge;
//!
//! let forge = GitLabForge::new("glpat-xxx", "mygroup/myproject");
//! let mr = forge.get_pr_by_head("feature").await?;
//! println!("{} {}", mr.markdown_url, mr.url);
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest, UpdatePrRequest};

/// Default GitLab API base URL.
pub const DEFAULT_API_BASE: &str = "https://gitlab.com/api/v4";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("git-stack/", env!("CARGO_PKG_VERSION"));

/// GitLab forge implementation.
#[derive(Clone)]
pub struct GitLabForge {
    /// HTTP client for making requests
    client: Client,
    /// Access token
    token: String,
    /// Full project path, e.g. `group/subgroup/project`
    project: String,
    /// API base URL (for self-hosted GitLab)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabForge")
            .field("has_token", &!self.token.is_empty())
            .field("project", &self.project)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitLabForge {
    /// Create a new GitLab forge for gitlab.com.
    ///
    /// # Example
    ///
    /// ```
    /// use git_stack::forge::gitlab::GitLabForge;
    ///
    /// let forge = GitLabForge::new("glpat-xxx", "mygroup/myproject");
    /// assert_eq!(forge.project(), "mygroup/myproject");
    /// ```
    pub fn new(token: impl Into<String>, project: impl Into<String>) -> Self {
        Self::with_api_base(token, project, DEFAULT_API_BASE)
    }

    /// Create a GitLab forge with a custom API base URL.
    ///
    /// Use this for self-hosted GitLab installations
    /// (e.g., `https://gitlab.example.com/api/v4`).
    pub fn with_api_base(
        token: impl Into<String>,
        project: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            project: project.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the project path.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "PRIVATE-TOKEN",
            HeaderValue::from_str(&self.token)
                .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Build URL for a project endpoint.
    fn project_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.api_base,
            urlencoding::encode(&self.project),
            path
        )
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            });
        }

        // GitLab reports `message` as a string or as a field -> errors map.
        let message = match response.json::<GitLabErrorResponse>().await {
            Ok(GitLabErrorResponse {
                message: Some(serde_json::Value::String(message)),
                ..
            }) => message,
            Ok(GitLabErrorResponse {
                message: Some(other),
                ..
            }) => other.to_string(),
            Ok(GitLabErrorResponse {
                error: Some(error), ..
            }) => error,
            _ => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitLab server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Forge for GitLabForge {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    async fn get_pr_by_head(&self, head: &str) -> Result<PullRequest, ForgeError> {
        let url = format!(
            "{}?source_branch={}&state=opened",
            self.project_url("merge_requests"),
            urlencoding::encode(head)
        );
        debug!(head, "looking up merge request");

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let mrs: Vec<GitLabMergeRequest> = self.handle_response(response).await?;
        mrs.into_iter()
            .next()
            .map(Into::into)
            .ok_or_else(|| ForgeError::NotFound(format!("no open merge request for '{head}'")))
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let body = CreateMergeRequestBody {
            source_branch: &request.head,
            target_branch: &request.base,
            title: &request.title,
            description: &request.body,
        };
        debug!(head = %request.head, base = %request.base, "creating merge request");

        let response = self
            .client
            .post(self.project_url("merge_requests"))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let mr: GitLabMergeRequest = self.handle_response(response).await?;
        Ok(mr.into())
    }

    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError> {
        let body = UpdateMergeRequestBody {
            title: request.title.as_deref(),
            description: request.body.as_deref(),
            target_branch: request.base.as_deref(),
        };
        debug!(iid = request.number, "updating merge request");

        let response = self
            .client
            .put(self.project_url(&format!("merge_requests/{}", request.number)))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let mr: GitLabMergeRequest = self.handle_response(response).await?;
        Ok(mr.into())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a merge request.
#[derive(Serialize)]
struct CreateMergeRequestBody<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
}

/// Request body for updating a merge request.
#[derive(Serialize)]
struct UpdateMergeRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_branch: Option<&'a str>,
}

/// GitLab error response format.
#[derive(Deserialize)]
struct GitLabErrorResponse {
    message: Option<serde_json::Value>,
    error: Option<String>,
}

/// GitLab merge request response format.
#[derive(Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    web_url: String,
    source_branch: String,
    target_branch: String,
    title: String,
    description: Option<String>,
}

impl From<GitLabMergeRequest> for PullRequest {
    fn from(mr: GitLabMergeRequest) -> Self {
        PullRequest {
            number: mr.iid,
            markdown_url: format!("!{}", mr.iid),
            url: mr.web_url,
            head: mr.source_branch,
            base: mr.target_branch,
            title: mr.title,
            body: mr.description.unwrap_or_default(),
        }
    }
}
