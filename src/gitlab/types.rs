//! GitLab REST v4 wire types consumed by the annotator.
//!
//! Only the fields the engine reads are declared; GitLab sends much more and
//! serde drops the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Project lookup response (subset). `web_url` feeds blob links.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub web_url: String,
}

/// The SHA triple binding inline positions to one revision of an MR.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffRefs {
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
}

/// Merge request metadata (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub iid: u64,
    pub diff_refs: DiffRefs,
}

/// One changed file of a commit or MR, with its raw unified-diff text.
#[derive(Debug, Clone, Deserialize)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    /// Unified diff; may be empty for binary files.
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
}

/// Anchor of a note inside a diff.
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub base_sha: Option<String>,
    pub start_sha: Option<String>,
    pub head_sha: Option<String>,
    #[serde(default)]
    pub position_type: String,
    pub new_path: Option<String>,
    pub new_line: Option<u32>,
    pub old_path: Option<String>,
    pub old_line: Option<u32>,
}

/// One note inside a discussion.
#[derive(Debug, Clone, Deserialize)]
pub struct Note {
    pub id: u64,
    pub body: String,
    pub position: Option<Position>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A discussion thread on a merge request.
#[derive(Debug, Clone, Deserialize)]
pub struct Discussion {
    pub id: String,
    #[serde(default)]
    pub individual_note: bool,
    pub notes: Vec<Note>,
}

/// A comment on a plain commit (no thread primitive at this level).
#[derive(Debug, Clone, Deserialize)]
pub struct CommitComment {
    pub note: String,
    pub path: Option<String>,
    pub line: Option<u32>,
}
