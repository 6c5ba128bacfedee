//! forge::mock
//!
//! In-memory forge for engine and CLI tests.
//!
//! Open requests live in a map numbered like GitLab merge requests (`!1`,
//! `!2`, ...). Every call is logged, and a [`FailOn`] can make chosen calls
//! fail.
//!
//! ```
//! use git_stack::forge::mock::MockForge;
//! use git_stack::forge::{CreatePrRequest, Forge, ForgeError};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//!
//! assert!(matches!(
//!     forge.get_pr_by_head("feature").await,
//!     Err(ForgeError::NotFound(_))
//! ));
//!
//! let pr = forge.create_pr(CreatePrRequest {
//!     head: "feature".to_string(),
//!     base: "main".to_string(),
//!     title: "feature".to_string(),
//!     body: String::new(),
//! }).await.unwrap();
//!
//! assert_eq!(pr.number, 1);
//! assert_eq!(pr.markdown_url, "!1");
//! assert_eq!(forge.get_pr_by_head("feature").await.unwrap(), pr);
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest, UpdatePrRequest};

/// Clones share one store.
#[derive(Debug, Clone)]
pub struct MockForge {
    shared: Arc<Mutex<Store>>,
}

#[derive(Debug)]
struct Store {
    open: BTreeMap<u64, PullRequest>,
    next_number: u64,
    fail_on: Option<FailOn>,
    log: Vec<MockOperation>,
}

/// Which calls the mock should reject, and with what.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetPrByHead(ForgeError),
    CreatePr(ForgeError),
    UpdatePr(ForgeError),
    /// Any call about this source branch.
    Head(String, ForgeError),
}

/// One logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetPrByHead {
        head: String,
    },
    CreatePr {
        head: String,
        base: String,
        title: String,
    },
    UpdatePr {
        number: u64,
        title: Option<String>,
        body: Option<String>,
        base: Option<String>,
    },
}

impl MockForge {
    pub fn new() -> Self {
        Self::with_prs(Vec::new())
    }

    /// Seed the store; fresh numbers continue after the largest seeded one.
    pub fn with_prs(prs: Vec<PullRequest>) -> Self {
        let highest = prs.iter().map(|p| p.number).max().unwrap_or(0);
        Self {
            shared: Arc::new(Mutex::new(Store {
                open: prs.into_iter().map(|p| (p.number, p)).collect(),
                next_number: highest + 1,
                fail_on: None,
                log: Vec::new(),
            })),
        }
    }

    /// A request shaped like the ones this mock hands out.
    pub fn pull_request(number: u64, head: &str, base: &str, body: &str) -> PullRequest {
        PullRequest {
            number,
            url: format!("https://gitlab.example.com/group/project/-/merge_requests/{}", number),
            markdown_url: format!("!{}", number),
            head: head.to_string(),
            base: base.to_string(),
            title: head.to_string(),
            body: body.to_string(),
        }
    }

    /// ```
    /// use git_stack::forge::mock::{FailOn, MockForge};
    /// use git_stack::forge::ForgeError;
    ///
    /// let forge = MockForge::new().fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Every call made so far, oldest first.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().log.clone()
    }

    pub fn pr_for_head(&self, head: &str) -> Option<PullRequest> {
        self.state().open.values().find(|p| p.head == head).cloned()
    }

    /// Stored requests by ascending number.
    pub fn all_prs(&self) -> Vec<PullRequest> {
        self.state().open.values().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, Store> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Log `op` and hand back the configured failure, if it matches.
    fn record(&self, op: MockOperation, head: Option<&str>) -> Result<(), ForgeError> {
        let mut store = self.state();
        let failure = match (&store.fail_on, &op) {
            (Some(FailOn::GetPrByHead(e)), MockOperation::GetPrByHead { .. })
            | (Some(FailOn::CreatePr(e)), MockOperation::CreatePr { .. })
            | (Some(FailOn::UpdatePr(e)), MockOperation::UpdatePr { .. }) => Some(e.clone()),
            (Some(FailOn::Head(failing, e)), _) if head == Some(failing.as_str()) => {
                Some(e.clone())
            }
            _ => None,
        };
        store.log.push(op);
        failure.map_or(Ok(()), Err)
    }

    fn head_of(&self, number: u64) -> Option<String> {
        self.state().open.get(&number).map(|p| p.head.clone())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_pr_by_head(&self, head: &str) -> Result<PullRequest, ForgeError> {
        self.record(
            MockOperation::GetPrByHead {
                head: head.to_string(),
            },
            Some(head),
        )?;
        tokio::task::yield_now().await;

        self.pr_for_head(head)
            .ok_or_else(|| ForgeError::NotFound(format!("no open merge request for '{head}'")))
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.record(
            MockOperation::CreatePr {
                head: request.head.clone(),
                base: request.base.clone(),
                title: request.title.clone(),
            },
            Some(&request.head),
        )?;
        tokio::task::yield_now().await;

        let mut store = self.state();
        if store.open.values().any(|p| p.head == request.head) {
            return Err(ForgeError::ApiError {
                status: 409,
                message: format!(
                    "Another open merge request already exists for this source branch: {}",
                    request.head
                ),
            });
        }

        let number = store.next_number;
        store.next_number += 1;

        let mut pr = Self::pull_request(number, &request.head, &request.base, &request.body);
        pr.title = request.title;
        store.open.insert(number, pr.clone());
        Ok(pr)
    }

    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError> {
        let head = self.head_of(request.number);
        self.record(
            MockOperation::UpdatePr {
                number: request.number,
                title: request.title.clone(),
                body: request.body.clone(),
                base: request.base.clone(),
            },
            head.as_deref(),
        )?;
        tokio::task::yield_now().await;

        let mut store = self.state();
        let pr = store
            .open
            .get_mut(&request.number)
            .ok_or_else(|| ForgeError::NotFound(format!("merge request !{}", request.number)))?;

        if let Some(title) = request.title {
            pr.title = title;
        }
        if let Some(body) = request.body {
            pr.body = body;
        }
        if let Some(base) = request.base {
            pr.base = base;
        }

        Ok(pr.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(head: &str) -> CreatePrRequest {
        CreatePrRequest {
            head: head.into(),
            base: "main".into(),
            title: head.into(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn create_pr_assigns_sequential_numbers() {
        let forge = MockForge::new();

        let pr1 = forge.create_pr(create("feature-1")).await.unwrap();
        let pr2 = forge.create_pr(create("feature-2")).await.unwrap();

        assert_eq!(pr1.number, 1);
        assert_eq!(pr2.number, 2);
        assert_eq!(pr2.markdown_url, "!2");
    }

    #[tokio::test]
    async fn duplicate_head_is_rejected() {
        let forge = MockForge::new();
        forge.create_pr(create("feature")).await.unwrap();

        let result = forge.create_pr(create("feature")).await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 409, .. })));
    }

    #[tokio::test]
    async fn get_pr_by_head_not_found() {
        let forge = MockForge::new();
        let result = forge.get_pr_by_head("nonexistent").await;
        assert!(matches!(result, Err(ForgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_pr_changes_only_given_fields() {
        let forge = MockForge::new();
        let pr = forge.create_pr(create("feature")).await.unwrap();

        let updated = forge
            .update_pr(UpdatePrRequest {
                number: pr.number,
                body: Some("stack".into()),
                base: Some("develop".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.title, "feature");
        assert_eq!(updated.body, "stack");
        assert_eq!(updated.base, "develop");
    }

    #[tokio::test]
    async fn update_missing_pr_fails() {
        let forge = MockForge::new();
        let result = forge
            .update_pr(UpdatePrRequest {
                number: 99,
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ForgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn fail_on_create_pr() {
        let forge = MockForge::new().fail_on(FailOn::CreatePr(ForgeError::RateLimited));

        let result = forge.create_pr(create("feature")).await;

        assert!(matches!(result, Err(ForgeError::RateLimited)));
        assert!(forge.all_prs().is_empty());

        forge.clear_fail_on();
        assert!(forge.create_pr(create("feature")).await.is_ok());
    }

    #[tokio::test]
    async fn fail_on_head_targets_one_branch() {
        let existing = MockForge::pull_request(5, "bad", "main", "");
        let forge = MockForge::with_prs(vec![existing])
            .fail_on(FailOn::Head("bad".into(), ForgeError::RateLimited));

        assert!(forge.create_pr(create("good")).await.is_ok());
        assert!(forge.get_pr_by_head("bad").await.is_err());
        let result = forge
            .update_pr(UpdatePrRequest {
                number: 5,
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ForgeError::RateLimited)));
    }

    #[tokio::test]
    async fn operations_recorded() {
        let forge = MockForge::new();

        let _ = forge.get_pr_by_head("feature").await;
        forge.create_pr(create("feature")).await.unwrap();

        assert_eq!(
            forge.operations(),
            vec![
                MockOperation::GetPrByHead {
                    head: "feature".into()
                },
                MockOperation::CreatePr {
                    head: "feature".into(),
                    base: "main".into(),
                    title: "feature".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn with_prs_numbers_after_existing() {
        let forge = MockForge::with_prs(vec![MockForge::pull_request(42, "existing", "main", "")]);

        let pr = forge.get_pr_by_head("existing").await.unwrap();
        assert_eq!(pr.number, 42);

        let new_pr = forge.create_pr(create("new")).await.unwrap();
        assert_eq!(new_pr.number, 43);
        assert_eq!(forge.all_prs().len(), 2);
    }
}
