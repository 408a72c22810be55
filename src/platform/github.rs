//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    ChangedFile, MembershipRole, PrComment, PrRef, PrReview, PrState, PullRequest, RemoteTeam,
    ReviewState, TeamPrivacy, TeamUpsert,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const PAGE_SIZE: &str = "100";

/// Body of `POST /orgs/{org}/teams`
#[derive(Serialize)]
struct CreateTeamBody<'a> {
    name: &'a str,
    description: &'a str,
    privacy: TeamPrivacy,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_team_id: Option<u64>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    maintainers: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    repo_names: &'a [String],
}

/// Body of `PATCH /orgs/{org}/teams/{slug}`; a null parent detaches the team
#[derive(Serialize)]
struct EditTeamBody<'a> {
    name: &'a str,
    description: &'a str,
    privacy: TeamPrivacy,
    parent_team_id: Option<u64>,
}

#[derive(Deserialize)]
struct MemberPayload {
    login: String,
}

#[derive(Deserialize)]
struct MembershipPayload {
    state: String,
}

#[derive(Serialize)]
struct MembershipBody {
    role: MembershipRole,
}

#[derive(Deserialize)]
struct ContentEntryPayload {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct PrFilePayload {
    filename: String,
    previous_filename: Option<String>,
}

/// GitHub service using octocrab for pull requests and raw HTTP for teams
pub struct GitHubService {
    client: Octocrab,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API base URL for raw requests, without trailing slash
    api_base: String,
}

impl GitHubService {
    /// Create a new GitHub service.
    ///
    /// `endpoint` overrides the API base (GitHub Enterprise, test servers).
    /// `skip_ssl` disables certificate verification on the raw HTTP client.
    pub fn new(token: &str, endpoint: Option<&str>, skip_ssl: bool) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        let api_base = if let Some(endpoint) = endpoint {
            let base = endpoint.trim_end_matches('/').to_string();
            builder = builder
                .base_uri(&base)
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
            base
        } else {
            DEFAULT_API_BASE.to_string()
        };

        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("governctl")
            .danger_accept_invalid_certs(skip_ssl)
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    fn request(&self, method: Method, url: &str, accept: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// GET every page of a list endpoint, following `Link: rel="next"`
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(format!("{}?per_page={PAGE_SIZE}", self.url(path)));

        while let Some(url) = next {
            debug!(%url, "fetching page");
            let response = ensure_success(
                self.request(Method::GET, &url, JSON_MEDIA_TYPE).send().await?,
                path,
            )
            .await?;
            next = next_page_url(response.headers());
            let page: Vec<T> = response.json().await?;
            items.extend(page);
        }

        Ok(items)
    }

    async fn team_by_slug(&self, org: &str, slug: &str) -> Result<Option<RemoteTeam>> {
        let path = format!("/orgs/{org}/teams/{}", urlencoding::encode(slug));
        let response = self
            .request(Method::GET, &self.url(&path), JSON_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response, &path).await?;
        Ok(Some(response.json().await?))
    }

    fn membership_path(org: &str, team_slug: &str, username: &str) -> String {
        format!(
            "/orgs/{org}/teams/{}/memberships/{}",
            urlencoding::encode(team_slug),
            urlencoding::encode(username)
        )
    }
}

/// Turn a non-2xx response into an error carrying the body
async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::GitHubApi(format!("{context}: {status}: {body}")))
}

/// Extract the `rel="next"` URL from a `Link` header
pub fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == r#"rel="next""#)
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

/// Approximation of GitHub's team slug derivation
fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

fn logins(users: Option<&[octocrab::models::Author]>) -> Vec<String> {
    users
        .unwrap_or_default()
        .iter()
        .map(|u| u.login.clone())
        .collect()
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    let state = match pr.state {
        Some(octocrab::models::IssueState::Open) => PrState::Open,
        Some(octocrab::models::IssueState::Closed) if pr.merged_at.is_some() => PrState::Merged,
        // IssueState is non-exhaustive, so use wildcard for Closed and any future variants
        Some(_) | None => PrState::Closed,
    };

    PullRequest {
        number: pr.number,
        title: pr.title.clone().unwrap_or_default(),
        body: pr.body.clone(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
        state,
        is_draft: pr.draft.unwrap_or(false),
        mergeable: pr.mergeable,
        labels: pr
            .labels
            .as_ref()
            .map(|labels| labels.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default(),
        assignees: logins(pr.assignees.as_deref()),
        requested_reviewers: logins(pr.requested_reviewers.as_deref()),
        base_ref: pr.base.ref_field.clone(),
        head_ref: pr.head.ref_field.clone(),
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        commits: pr.commits,
    }
}

fn review_state_from_octocrab(state: Option<&octocrab::models::pulls::ReviewState>) -> ReviewState {
    use octocrab::models::pulls::ReviewState as Remote;
    match state {
        Some(Remote::Approved) => ReviewState::Approved,
        Some(Remote::ChangesRequested) => ReviewState::ChangesRequested,
        Some(Remote::Commented) => ReviewState::Commented,
        Some(Remote::Dismissed) => ReviewState::Dismissed,
        // ReviewState is non-exhaustive
        Some(_) | None => ReviewState::Pending,
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn find_team(&self, org: &str, name: &str) -> Result<Option<RemoteTeam>> {
        debug!(org, name, "finding team");
        if let Some(team) = self.team_by_slug(org, &slugify(name)).await?
            && (team.name == name || team.slug == name)
        {
            debug!(team_id = team.id, "found team by slug");
            return Ok(Some(team));
        }

        let teams: Vec<RemoteTeam> = self.get_all(&format!("/orgs/{org}/teams")).await?;
        let found = teams
            .into_iter()
            .find(|t| t.name == name || t.slug.eq_ignore_ascii_case(name));
        debug!(found = found.is_some(), "listed teams");
        Ok(found)
    }

    async fn upsert_team(&self, org: &str, team: &TeamUpsert) -> Result<RemoteTeam> {
        let response = if let Some(existing) = self.find_team(org, &team.name).await? {
            debug!(org, team = %team.name, slug = %existing.slug, "updating team");
            let path = format!("/orgs/{org}/teams/{}", urlencoding::encode(&existing.slug));
            let body = EditTeamBody {
                name: &team.name,
                description: &team.description,
                privacy: team.privacy,
                parent_team_id: team.parent_id,
            };
            let response = self
                .request(Method::PATCH, &self.url(&path), JSON_MEDIA_TYPE)
                .json(&body)
                .send()
                .await?;
            ensure_success(response, &path).await?
        } else {
            debug!(org, team = %team.name, "creating team");
            let path = format!("/orgs/{org}/teams");
            let body = CreateTeamBody {
                name: &team.name,
                description: &team.description,
                privacy: team.privacy,
                parent_team_id: team.parent_id,
                maintainers: &team.maintainers,
                repo_names: &team.repo_names,
            };
            let response = self
                .request(Method::POST, &self.url(&path), JSON_MEDIA_TYPE)
                .json(&body)
                .send()
                .await?;
            ensure_success(response, &path).await?
        };

        let remote: RemoteTeam = response.json().await?;
        debug!(team_id = remote.id, slug = %remote.slug, "upserted team");
        Ok(remote)
    }

    async fn list_team_members(&self, org: &str, team_slug: &str) -> Result<Vec<String>> {
        debug!(org, team_slug, "listing team members");
        let members: Vec<MemberPayload> = self
            .get_all(&format!(
                "/orgs/{org}/teams/{}/members",
                urlencoding::encode(team_slug)
            ))
            .await?;
        Ok(members.into_iter().map(|m| m.login).collect())
    }

    async fn add_team_member(
        &self,
        org: &str,
        team_slug: &str,
        username: &str,
        role: MembershipRole,
    ) -> Result<()> {
        debug!(org, team_slug, username, role = role.as_str(), "adding team member");
        let path = Self::membership_path(org, team_slug, username);
        let response = self
            .request(Method::PUT, &self.url(&path), JSON_MEDIA_TYPE)
            .json(&MembershipBody { role })
            .send()
            .await?;
        ensure_success(response, &path).await?;
        Ok(())
    }

    async fn remove_team_member(&self, org: &str, team_slug: &str, username: &str) -> Result<()> {
        debug!(org, team_slug, username, "removing team member");
        let path = Self::membership_path(org, team_slug, username);
        let response = self
            .request(Method::DELETE, &self.url(&path), JSON_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(username, "membership already absent");
            return Ok(());
        }
        ensure_success(response, &path).await?;
        Ok(())
    }

    async fn is_team_member(&self, org: &str, team_slug: &str, username: &str) -> Result<bool> {
        debug!(org, team_slug, username, "checking team membership");
        let path = Self::membership_path(org, team_slug, username);
        let response = self
            .request(Method::GET, &self.url(&path), JSON_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let membership: MembershipPayload = ensure_success(response, &path).await?.json().await?;
        Ok(membership.state == "active")
    }

    async fn list_open_prs(&self, org: &str, repo: &str) -> Result<Vec<PullRequest>> {
        debug!(org, repo, "listing open PRs");
        let page = self
            .client
            .pulls(org, repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(100)
            .send()
            .await?;
        let prs = self.client.all_pages(page).await?;

        let result: Vec<PullRequest> = prs.iter().map(pr_from_octocrab).collect();
        debug!(org, repo, count = result.len(), "listed open PRs");
        Ok(result)
    }

    async fn get_pr(&self, pr: &PrRef) -> Result<PullRequest> {
        debug!(%pr, "getting PR");
        let remote = self
            .client
            .pulls(&pr.org, &pr.repo)
            .get(pr.number)
            .await?;

        let result = pr_from_octocrab(&remote);
        debug!(%pr, state = %result.state, "got PR");
        Ok(result)
    }

    async fn list_pr_comments(&self, pr: &PrRef) -> Result<Vec<PrComment>> {
        debug!(%pr, "listing PR comments");
        let page = self
            .client
            .issues(&pr.org, &pr.repo)
            .list_comments(pr.number)
            .per_page(100)
            .send()
            .await?;
        let comments = self.client.all_pages(page).await?;

        let result: Vec<PrComment> = comments
            .into_iter()
            .map(|c| PrComment {
                id: c.id.0,
                author: c.user.login,
                body: c.body.unwrap_or_default(),
            })
            .collect();
        debug!(%pr, count = result.len(), "listed PR comments");
        Ok(result)
    }

    async fn list_pr_reviews(&self, pr: &PrRef) -> Result<Vec<PrReview>> {
        debug!(%pr, "listing PR reviews");
        let page = self
            .client
            .pulls(&pr.org, &pr.repo)
            .list_reviews(pr.number)
            .send()
            .await?;
        let reviews = self.client.all_pages(page).await?;

        let result: Vec<PrReview> = reviews
            .into_iter()
            .map(|r| PrReview {
                id: r.id.0,
                author: r.user.map(|u| u.login).unwrap_or_default(),
                body: r.body.unwrap_or_default(),
                state: review_state_from_octocrab(r.state.as_ref()),
            })
            .collect();
        debug!(%pr, count = result.len(), "listed PR reviews");
        Ok(result)
    }

    async fn list_changed_files(&self, pr: &PrRef) -> Result<Vec<ChangedFile>> {
        debug!(%pr, "listing changed files");
        let files: Vec<PrFilePayload> = self
            .get_all(&format!(
                "/repos/{}/{}/pulls/{}/files",
                pr.org, pr.repo, pr.number
            ))
            .await?;
        Ok(files
            .into_iter()
            .map(|f| ChangedFile {
                path: f.filename,
                previous_path: f.previous_filename,
            })
            .collect())
    }

    async fn add_assignees(&self, pr: &PrRef, assignees: &[String]) -> Result<()> {
        debug!(%pr, ?assignees, "adding assignees");
        let logins: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(&pr.org, &pr.repo)
            .add_assignees(pr.number, &logins)
            .await?;
        Ok(())
    }

    async fn request_reviewers(&self, pr: &PrRef, reviewers: &[String]) -> Result<()> {
        debug!(%pr, ?reviewers, "requesting reviewers");
        self.client
            .pulls(&pr.org, &pr.repo)
            .request_reviews(pr.number, reviewers.to_vec(), Vec::<String>::new())
            .await?;
        Ok(())
    }

    async fn add_labels(&self, pr: &PrRef, labels: &[String]) -> Result<()> {
        debug!(%pr, ?labels, "adding labels");
        self.client
            .issues(&pr.org, &pr.repo)
            .add_labels(pr.number, labels)
            .await?;
        Ok(())
    }

    async fn fetch_file(&self, org: &str, repo: &str, path: &str) -> Result<Option<String>> {
        debug!(org, repo, path, "fetching file");
        let api_path = format!("/repos/{org}/{repo}/contents/{}", path.trim_start_matches('/'));
        let response = self
            .request(Method::GET, &self.url(&api_path), RAW_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let content = ensure_success(response, &api_path).await?.text().await?;
        Ok(Some(content))
    }

    async fn list_dir(&self, org: &str, repo: &str, path: &str) -> Result<Option<Vec<String>>> {
        debug!(org, repo, path, "listing directory");
        let api_path = format!(
            "/repos/{org}/{repo}/contents/{}",
            path.trim_start_matches('/').trim_end_matches('/')
        );
        let response = self
            .request(Method::GET, &self.url(&api_path), JSON_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entries: Vec<ContentEntryPayload> = ensure_success(response, &api_path)
            .await?
            .json()
            .await?;
        Ok(Some(
            entries
                .into_iter()
                .filter(|e| e.kind == "file")
                .map(|e| e.path)
                .collect(),
        ))
    }
}
