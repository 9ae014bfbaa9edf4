//! GitLab REST v4 client.
//!
//! Endpoints used:
//! - GET  /projects/:id
//! - GET  /projects/:id/merge_requests/:iid                    (diff_refs)
//! - GET  /projects/:id/merge_requests/:iid/diffs              (paged)
//! - GET  /projects/:id/merge_requests/:iid/discussions        (paged)
//! - POST /projects/:id/merge_requests/:iid/discussions        (inline)
//! - POST /projects/:id/merge_requests/:iid/notes              (global)
//! - GET  /projects/:id/repository/commits/:sha/diff
//! - GET  /projects/:id/repository/commits/:sha/comments       (paged)
//! - POST /projects/:id/repository/commits/:sha/comments
//! - POST /projects/:id/statuses/:sha
//!
//! Every call is blocking from the pipeline's point of view (awaited in
//! sequence) and any transport failure is fatal for the run; retries are the
//! caller's concern, not ours.

pub mod guard;
pub mod types;

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GitlabConfig;
use crate::errors::{AnnotateResult, Error, GitlabError};
use types::{CommitComment, Discussion, FileDiff, MergeRequest, Project};

const PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct GitlabClient {
    http: reqwest::Client,
    base_api: String,
    headers: HeaderMap,
    /// URL-encoded project ID or "group/project" path.
    project: String,
}

impl GitlabClient {
    pub fn new(cfg: &GitlabConfig) -> AnnotateResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("mr-annotator/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "PRIVATE-TOKEN",
            HeaderValue::from_str(&cfg.token)
                .map_err(|e| Error::Validation(format!("bad token: {e}")))?,
        );

        Ok(Self {
            http,
            base_api: cfg.base_api.trim_end_matches('/').to_string(),
            headers,
            project: urlencoding::encode(&cfg.project).into_owned(),
        })
    }

    /// Resolves the project once per run; also serves as an early check that
    /// the URL/token/project configuration is usable.
    pub async fn get_project(&self) -> AnnotateResult<Project> {
        let url = format!("{}/projects/{}", self.base_api, self.project);
        let resp = self.http.get(&url).headers(self.headers.clone()).send().await?;
        let resp = ensure_success("get project", resp).await?;
        Ok(resp.json().await?)
    }

    /// Merge request metadata; carries the base/start/head SHA triple.
    pub async fn get_merge_request(&self, iid: u64) -> AnnotateResult<MergeRequest> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}",
            self.base_api, self.project, iid
        );
        let resp = self.http.get(&url).headers(self.headers.clone()).send().await?;
        let resp = ensure_success("get merge request", resp).await?;
        Ok(resp.json().await?)
    }

    /// File-level diffs of a merge request.
    pub async fn get_merge_request_diffs(&self, iid: u64) -> AnnotateResult<Vec<FileDiff>> {
        let path = format!("projects/{}/merge_requests/{}/diffs", self.project, iid);
        self.get_paged("get merge request diffs", &path).await
    }

    /// File-level diffs of a plain commit.
    pub async fn get_commit_diff(&self, sha: &str) -> AnnotateResult<Vec<FileDiff>> {
        let path = format!("projects/{}/repository/commits/{}/diff", self.project, sha);
        self.get_paged("get commit diff", &path).await
    }

    /// Every discussion thread of a merge request, all pages concatenated in
    /// the order returned.
    pub async fn get_all_discussions(&self, iid: u64) -> AnnotateResult<Vec<Discussion>> {
        let path = format!("projects/{}/merge_requests/{}/discussions", self.project, iid);
        self.get_paged("get discussions", &path).await
    }

    /// Every comment on a plain commit, all pages concatenated.
    pub async fn get_commit_comments(&self, sha: &str) -> AnnotateResult<Vec<CommitComment>> {
        let path = format!("projects/{}/repository/commits/{}/comments", self.project, sha);
        self.get_paged("get commit comments", &path).await
    }

    /// Creates or updates the persistent status marker for a revision.
    pub async fn post_commit_status(
        &self,
        cfg: &GitlabConfig,
        state: &str,
        description: &str,
    ) -> AnnotateResult<()> {
        let url = format!(
            "{}/projects/{}/statuses/{}",
            self.base_api, self.project, cfg.commit_sha
        );

        #[derive(serde::Serialize)]
        struct Req<'a> {
            state: &'a str,
            #[serde(rename = "ref")]
            ref_name: &'a str,
            name: &'a str,
            description: &'a str,
        }

        debug!("gitlab: status POST state={} sha={}", state, cfg.commit_sha);
        let resp = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&Req {
                state,
                ref_name: &cfg.ref_name,
                name: &cfg.status_name,
                description,
            })
            .send()
            .await?;
        ensure_success("post commit status", resp).await?;
        Ok(())
    }

    /// Opens an inline discussion on a merge request diff.
    pub async fn create_discussion(
        &self,
        iid: u64,
        body: &str,
        path: &str,
        line: u32,
        refs: &types::DiffRefs,
    ) -> AnnotateResult<()> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/discussions",
            self.base_api, self.project, iid
        );

        #[derive(serde::Serialize)]
        struct Position<'a> {
            position_type: &'a str,
            new_path: &'a str,
            new_line: u32,
            base_sha: &'a str,
            start_sha: &'a str,
            head_sha: &'a str,
        }
        #[derive(serde::Serialize)]
        struct Req<'a> {
            body: &'a str,
            position: Position<'a>,
        }

        debug!("gitlab: discussion POST path={} line={}", path, line);
        let resp = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&Req {
                body,
                position: Position {
                    position_type: "text",
                    new_path: path,
                    new_line: line,
                    base_sha: &refs.base_sha,
                    start_sha: &refs.start_sha,
                    head_sha: &refs.head_sha,
                },
            })
            .send()
            .await?;
        ensure_success("create discussion", resp).await?;
        Ok(())
    }

    /// Adds an unanchored note to a merge request.
    pub async fn add_merge_request_note(&self, iid: u64, body: &str) -> AnnotateResult<()> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/notes",
            self.base_api, self.project, iid
        );

        #[derive(serde::Serialize)]
        struct Req<'a> {
            body: &'a str,
        }

        debug!("gitlab: note POST iid={}", iid);
        let resp = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&Req { body })
            .send()
            .await?;
        ensure_success("add merge request note", resp).await?;
        Ok(())
    }

    /// Comments on a plain commit; `path`/`line` anchor the comment to the
    /// new revision when present, otherwise the comment is global.
    pub async fn post_commit_comment(
        &self,
        sha: &str,
        body: &str,
        path: Option<&str>,
        line: Option<u32>,
    ) -> AnnotateResult<()> {
        let url = format!(
            "{}/projects/{}/repository/commits/{}/comments",
            self.base_api, self.project, sha
        );

        #[derive(serde::Serialize)]
        struct Req<'a> {
            note: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            path: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            line: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            line_type: Option<&'a str>,
        }

        debug!("gitlab: commit comment POST sha={} path={:?} line={:?}", sha, path, line);
        let resp = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&Req {
                note: body,
                path,
                line,
                line_type: line.map(|_| "new"),
            })
            .send()
            .await?;
        ensure_success("post commit comment", resp).await?;
        Ok(())
    }

    /// Sequential pagination: pages are concatenated in the order returned;
    /// a short or empty page ends the loop.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        op: &'static str,
        path: &str,
    ) -> AnnotateResult<Vec<T>> {
        let mut out = Vec::new();
        let mut page = 1usize;
        loop {
            let url = format!(
                "{}/{}?per_page={}&page={}",
                self.base_api, path, PER_PAGE, page
            );
            let resp = self.http.get(&url).headers(self.headers.clone()).send().await?;
            let resp = ensure_success(op, resp).await?;
            let items: Vec<T> = resp.json().await?;
            let short_page = items.len() < PER_PAGE;
            out.extend(items);
            if short_page {
                break;
            }
            page += 1;
        }
        debug!("gitlab: {} fetched {} items over {} page(s)", op, out.len(), page);
        Ok(out)
    }
}

async fn ensure_success(
    op: &'static str,
    resp: reqwest::Response,
) -> AnnotateResult<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.ok();
    Err(GitlabError::Api { op, status, body }.into())
}

/// Blob link for a file (optionally a line) at a revision.
pub fn blob_url(project_web_url: &str, revision: &str, path: &str, line: Option<u32>) -> String {
    let mut url = format!("{}/blob/{}/{}", project_web_url, revision, path);
    if let Some(line) = line {
        url.push_str(&format!("#L{line}"));
    }
    url
}
