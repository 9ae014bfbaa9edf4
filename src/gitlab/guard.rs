//! Run-scoped duplicate detection.
//!
//! Re-running analysis on an unchanged revision must not grow the comment
//! volume, so before posting an annotation the guard checks whether an equal
//! one already exists. The existing threads are fetched at most once per run
//! and cached on the guard instance itself; construct one guard per run and
//! never share it across runs or threads.
//!
//! A failed fetch propagates: posting without a working duplicate check risks
//! unbounded comment growth on repeated runs, which is worse than aborting.

use tracing::debug;

use crate::errors::AnnotateResult;
use crate::gitlab::GitlabClient;
use crate::gitlab::types::{CommitComment, Note};

/// The revision surface the guard checks against.
#[derive(Debug, Clone)]
pub enum RevisionContext {
    /// An open merge request: duplicates live in discussion notes anchored by
    /// (path, line, base/head SHA pair).
    MergeRequest {
        iid: u64,
        base_sha: String,
        head_sha: String,
    },
    /// A direct commit: no thread primitive, duplicates live in the commit's
    /// comment listing anchored by (path, line).
    Commit { sha: String },
}

pub struct DuplicateGuard<'a> {
    client: &'a GitlabClient,
    context: RevisionContext,
    notes: Option<Vec<Note>>,
    comments: Option<Vec<CommitComment>>,
}

impl<'a> DuplicateGuard<'a> {
    pub fn new(client: &'a GitlabClient, context: RevisionContext) -> Self {
        Self {
            client,
            context,
            notes: None,
            comments: None,
        }
    }

    /// True iff an annotation with exactly this body at exactly this anchor
    /// already exists on the revision. Every field must match; a body match
    /// alone is not enough, the same message can legitimately recur on
    /// another line.
    pub async fn exists(&mut self, path: &str, line: u32, body: &str) -> AnnotateResult<bool> {
        match self.context.clone() {
            RevisionContext::MergeRequest {
                iid,
                base_sha,
                head_sha,
            } => {
                let notes = self.merge_request_notes(iid).await?;
                Ok(notes
                    .iter()
                    .any(|n| note_matches(n, path, line, body, &base_sha, &head_sha)))
            }
            RevisionContext::Commit { sha } => {
                let comments = self.commit_comments(&sha).await?;
                Ok(comments.iter().any(|c| comment_matches(c, path, line, body)))
            }
        }
    }

    async fn merge_request_notes(&mut self, iid: u64) -> AnnotateResult<&[Note]> {
        if self.notes.is_none() {
            debug!("guard: fetching existing merge request discussions");
            let discussions = self.client.get_all_discussions(iid).await?;
            let notes: Vec<Note> = discussions.into_iter().flat_map(|d| d.notes).collect();
            debug!("guard: cached {} existing notes", notes.len());
            self.notes = Some(notes);
        }
        Ok(self.notes.as_deref().unwrap_or_default())
    }

    async fn commit_comments(&mut self, sha: &str) -> AnnotateResult<&[CommitComment]> {
        if self.comments.is_none() {
            debug!("guard: fetching existing commit comments");
            let comments = self.client.get_commit_comments(sha).await?;
            debug!("guard: cached {} existing comments", comments.len());
            self.comments = Some(comments);
        }
        Ok(self.comments.as_deref().unwrap_or_default())
    }
}

fn note_matches(
    note: &Note,
    path: &str,
    line: u32,
    body: &str,
    base_sha: &str,
    head_sha: &str,
) -> bool {
    if note.body != body {
        return false;
    }
    let Some(position) = &note.position else {
        return false;
    };
    position.new_path.as_deref() == Some(path)
        && position.new_line == Some(line)
        && position.base_sha.as_deref() == Some(base_sha)
        && position.head_sha.as_deref() == Some(head_sha)
}

fn comment_matches(comment: &CommitComment, path: &str, line: u32, body: &str) -> bool {
    comment.note == body && comment.path.as_deref() == Some(path) && comment.line == Some(line)
}
