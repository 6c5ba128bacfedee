//! forge::github
//!
//! Pull requests on GitHub (and GitHub Enterprise) through the REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `get_pr_by_head` | `GET repos/{owner}/{repo}/pulls?head={owner}:{head}&state=open` |
//! | `create_pr` | `POST repos/{owner}/{repo}/pulls` |
//! | `update_pr` | `PATCH repos/{owner}/{repo}/pulls/{number}` |
//!
//! The token travels as `Authorization: Bearer`. A 429 surfaces as
//! [`ForgeError::RateLimited`]; nothing here retries.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest, UpdatePrRequest};

/// API root for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const CLIENT_ID: &str = concat!("git-stack/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Talks to one GitHub repository.
#[derive(Clone)]
pub struct GitHubForge {
    http: Client,
    token: String,
    owner: String,
    repo: String,
    base: String,
}

impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("repository", &format!("{}/{}", self.owner, self.repo))
            .field("base", &self.base)
            .field("token_set", &!self.token.is_empty())
            .finish()
    }
}

impl GitHubForge {
    pub fn new(token: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_api_base(token, owner, name, DEFAULT_API_BASE)
    }

    /// Point at another API root, such as `https://ghe.corp/api/v3`.
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        let base = base.into();
        Self {
            http: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: name.into(),
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    fn pulls_endpoint(&self, suffix: Option<u64>) -> String {
        let mut url = format!("{}/repos/{}/{}/pulls", self.base, self.owner, self.repo);
        if let Some(number) = suffix {
            url.push_str(&format!("/{number}"));
        }
        url
    }

    /// Attach auth and GitHub's media headers, send, and decode the reply.
    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;

        let response = builder
            .header(AUTHORIZATION, bearer)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, CLIENT_ID)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("unexpected response body: {e}"),
            });
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("token rejected".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(message),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_pr_by_head(&self, head: &str) -> Result<PullRequest, ForgeError> {
        debug!(head, "searching open pull requests");
        // GitHub wants `owner:branch` for same-repository heads.
        let qualified = format!("{}:{}", self.owner, head);
        let request = self
            .http
            .get(self.pulls_endpoint(None))
            .query(&[("head", qualified.as_str()), ("state", "open")]);

        let found: Vec<Pull> = self.call(request).await?;
        match found.into_iter().next() {
            Some(pull) => Ok(pull.into()),
            None => Err(ForgeError::NotFound(format!(
                "no open pull request for '{head}'"
            ))),
        }
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        debug!(head = %request.head, base = %request.base, "opening pull request");
        let payload = NewPull {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: &request.body,
        };
        let created: Pull = self
            .call(self.http.post(self.pulls_endpoint(None)).json(&payload))
            .await?;
        Ok(created.into())
    }

    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError> {
        debug!(number = request.number, "editing pull request");
        let payload = PullEdit {
            title: request.title.as_deref(),
            body: request.body.as_deref(),
            base: request.base.as_deref(),
        };
        let edited: Pull = self
            .call(
                self.http
                    .patch(self.pulls_endpoint(Some(request.number)))
                    .json(&payload),
            )
            .await?;
        Ok(edited.into())
    }
}

#[derive(Serialize)]
struct NewPull<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    body: &'a str,
}

/// PATCH payload; absent fields stay as they are.
#[derive(Serialize)]
struct PullEdit<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<&'a str>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct Pull {
    number: u64,
    html_url: String,
    head: BranchRef,
    base: BranchRef,
    title: String,
    body: Option<String>,
}

#[derive(Deserialize)]
struct BranchRef {
    #[serde(rename = "ref")]
    name: String,
}

impl From<Pull> for PullRequest {
    fn from(pull: Pull) -> Self {
        PullRequest {
            markdown_url: format!("#{}", pull.number),
            number: pull.number,
            url: pull.html_url,
            head: pull.head.name,
            base: pull.base.name,
            title: pull.title,
            body: pull.body.unwrap_or_default(),
        }
    }
}
