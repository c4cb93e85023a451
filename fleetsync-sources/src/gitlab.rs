//! GitLab REST v4: owned projects and their latest commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetsync_core::{ApiError, GitLabSettings, HttpClient};

const SERVICE: &str = "gitlab";
pub const PER_PAGE: usize = 100;
/// Hard stop for pagination in case headers never signal the last page.
const MAX_PAGES: u32 = 500;

const UNKNOWN_COMMITTER: &str = "Unknown";
const NO_MESSAGE: &str = "No message";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub web_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub committer_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A project flattened together with its most recent commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSummary {
    pub name: String,
    pub url: String,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub committer: String,
    pub message: String,
}

impl RepoSummary {
    pub fn from_parts(project: &Project, commit: Option<&Commit>) -> Self {
        let last_commit_at = commit
            .and_then(|c| c.created_at.as_deref())
            .and_then(|raw| match DateTime::parse_from_rfc3339(raw) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(err) => {
                    tracing::warn!(project = %project.name, raw, error = %err, "unparseable commit date");
                    None
                }
            });
        let committer = commit
            .and_then(|c| c.committer_name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_COMMITTER.to_string());
        let message = commit
            .and_then(|c| c.message.as_deref())
            .map(str::trim_end)
            .filter(|m| !m.is_empty())
            .unwrap_or(NO_MESSAGE)
            .to_string();

        Self {
            name: project.name.clone(),
            url: project.web_url.clone(),
            last_commit_at,
            committer,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: HttpClient,
    api_url: String,
    token: String,
}

impl GitLabClient {
    pub fn new(settings: &GitLabSettings) -> Self {
        Self {
            http: HttpClient::new(SERVICE),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    fn request(&self, path: &str) -> ureq::Request {
        self.http
            .request("GET", &format!("{}/{path}", self.api_url))
            .set("Authorization", &format!("Bearer {}", self.token))
    }

    /// Every project the token's user owns, across all pages.
    pub fn list_owned_projects(&self) -> Result<Vec<Project>, ApiError> {
        let mut projects = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self
                .request("projects")
                .query("owned", "true")
                .query("simple", "true")
                .query("per_page", &PER_PAGE.to_string())
                .query("page", &page.to_string());
            let response = self.http.call(request)?;
            let total_pages = header_number(&response, "x-total-pages");
            let next_page = header_number(&response, "x-next-page");
            let batch: Vec<Project> = self.http.read_json(response)?;
            tracing::debug!(page, fetched = batch.len(), ?total_pages, "project page");
            let batch_len = batch.len();
            projects.extend(batch);

            match next_page_after(page, batch_len, total_pages, next_page) {
                Some(next) if next <= MAX_PAGES => page = next,
                Some(_) => {
                    tracing::warn!(pages = MAX_PAGES, "stopping project pagination at page cap");
                    break;
                }
                None => break,
            }
        }

        tracing::info!(count = projects.len(), "listed owned projects");
        Ok(projects)
    }

    /// Most recent commit on the default branch, if the repository has any.
    pub fn last_commit(&self, project_id: u64) -> Result<Option<Commit>, ApiError> {
        let request = self
            .request(&format!("projects/{project_id}/repository/commits"))
            .query("per_page", "1");
        let response = self.http.call(request)?;
        let commits: Vec<Commit> = self.http.read_json(response)?;
        Ok(commits.into_iter().next())
    }

    /// Owned projects with their last commit. A failed commit lookup is
    /// logged and the project reported without one.
    pub fn list_repos(&self) -> Result<Vec<RepoSummary>, ApiError> {
        let projects = self.list_owned_projects()?;
        let mut repos = Vec::with_capacity(projects.len());
        for project in &projects {
            let commit = match self.last_commit(project.id) {
                Ok(commit) => commit,
                Err(err) => {
                    tracing::warn!(project = %project.name, error = %err, "last commit lookup failed");
                    None
                }
            };
            repos.push(RepoSummary::from_parts(project, commit.as_ref()));
        }
        Ok(repos)
    }
}

fn header_number(response: &ureq::Response, name: &str) -> Option<u32> {
    response
        .header(name)
        .and_then(|v| v.trim().parse::<u32>().ok())
}

/// Which page to fetch after `current`, if any.
///
/// `X-Total-Pages` is authoritative when present. GitLab drops it for very
/// large collections, in which case `X-Next-Page` is followed, and failing
/// that a short page marks the end.
pub(crate) fn next_page_after(
    current: u32,
    batch_len: usize,
    total_pages: Option<u32>,
    next_page: Option<u32>,
) -> Option<u32> {
    if let Some(total) = total_pages {
        return (current < total).then_some(current + 1);
    }
    if let Some(next) = next_page {
        return (next > current).then_some(next);
    }
    (batch_len >= PER_PAGE).then_some(current + 1)
}
