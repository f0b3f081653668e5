use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::auth::{AccountType, PermissionLevel};
use crate::credential::ScopedCredential;
use crate::github::host::{Comment, HostConnector, HostError, PullRequestHead, RepositoryHost};
use crate::github::RepoRef;

const COMMENTS_PER_PAGE: usize = 100;
const MAX_COMMENT_PAGES: u32 = 10;

#[derive(Deserialize)]
struct UserResponse {
    #[serde(rename = "type")]
    account_type: String,
}

#[derive(Deserialize)]
struct PermissionResponse {
    permission: String,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    default_branch: String,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    state: String,
    head: HeadResponse,
}

#[derive(Deserialize)]
struct HeadResponse {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Deserialize)]
struct CommentResponse {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    user: Option<CommentUser>,
}

#[derive(Deserialize)]
struct CommentUser {
    login: String,
}

#[derive(Deserialize)]
struct CreatedComment {
    id: u64,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// GitHub REST client scoped to one repository
pub struct GithubClient {
    http_client: Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubClient {
    pub fn new(
        api_base: &str,
        repo: RepoRef,
        credential: &ScopedCredential,
    ) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("actionrun"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|_| HostError::InvalidCredential)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, self.repo.owner, self.repo.name, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, HostError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| HostError::InvalidResponse(format!("{operation}: {e}")));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text);

        Err(HostError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RepositoryHost for GithubClient {
    async fn account_type(&self, login: &str) -> Result<AccountType, HostError> {
        let user: UserResponse = self
            .send_json(
                "get user",
                self.http_client.get(format!("{}/users/{}", self.api_base, login)),
            )
            .await?;
        Ok(AccountType::parse(&user.account_type))
    }

    async fn permission_level(&self, login: &str) -> Result<PermissionLevel, HostError> {
        let permission: PermissionResponse = self
            .send_json(
                "get collaborator permission",
                self.http_client.get(self.repo_url(&format!("/collaborators/{login}/permission"))),
            )
            .await?;
        Ok(PermissionLevel::parse(&permission.permission))
    }

    async fn default_branch(&self) -> Result<String, HostError> {
        let repo: RepositoryResponse = self
            .send_json("get repository", self.http_client.get(self.repo_url("")))
            .await?;
        Ok(repo.default_branch)
    }

    async fn pull_request_head(&self, number: u64) -> Result<PullRequestHead, HostError> {
        let pr: PullRequestResponse = self
            .send_json(
                "get pull request",
                self.http_client.get(self.repo_url(&format!("/pulls/{number}"))),
            )
            .await?;
        Ok(PullRequestHead {
            branch: pr.head.branch,
            open: pr.state == "open",
        })
    }

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<Comment>, HostError> {
        let mut comments = Vec::new();

        for page in 1..=MAX_COMMENT_PAGES {
            let batch: Vec<CommentResponse> = self
                .send_json(
                    "list issue comments",
                    self.http_client
                        .get(self.repo_url(&format!("/issues/{number}/comments")))
                        .query(&[
                            ("per_page", COMMENTS_PER_PAGE.to_string()),
                            ("page", page.to_string()),
                        ]),
                )
                .await?;

            let last_page = batch.len() < COMMENTS_PER_PAGE;
            comments.extend(batch.into_iter().map(|c| Comment {
                id: c.id,
                author: c.user.map(|u| u.login).unwrap_or_default(),
                body: c.body.unwrap_or_default(),
                created_at: c.created_at.unwrap_or_default(),
            }));

            if last_page {
                break;
            }
        }

        Ok(comments)
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<u64, HostError> {
        let created: CreatedComment = self
            .send_json(
                "create comment",
                self.http_client
                    .post(self.repo_url(&format!("/issues/{number}/comments")))
                    .json(&json!({ "body": body })),
            )
            .await?;
        Ok(created.id)
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), HostError> {
        let _: serde_json::Value = self
            .send_json(
                "update comment",
                self.http_client
                    .patch(self.repo_url(&format!("/issues/comments/{comment_id}")))
                    .json(&json!({ "body": body })),
            )
            .await?;
        Ok(())
    }
}

/// Connects [`GithubClient`]s for a fixed API base and repository
pub struct GithubConnector {
    pub api_base: String,
    pub repo: RepoRef,
}

impl HostConnector for GithubConnector {
    fn connect(&self, credential: &ScopedCredential) -> Result<Box<dyn RepositoryHost>, HostError> {
        Ok(Box::new(GithubClient::new(
            &self.api_base,
            self.repo.clone(),
            credential,
        )?))
    }
}
