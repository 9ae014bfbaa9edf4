//! Unified-diff position index.
//!
//! Recovers the set of commentable positions of one file at the new revision:
//! every added line, with its 1-based line number and literal content. The
//! line content is kept because the commenting API needs it to disambiguate
//! identical line numbers across hunks.
//!
//! Only the minimal unified-diff surface is recognized: the hunk header and
//! the per-line `+`/` `/`-` markers. Context lines advance the counter but
//! are not commentable (anchoring to them is unreliable on the remote side),
//! and deleted lines no longer exist in the new revision. Anything else
//! (file headers, `\ No newline` markers) is skipped without advancing.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::ParseError;

lazy_static! {
    // http://en.wikipedia.org/wiki/Diff_utility#Unified_format
    static ref HUNK_HEADER: Regex =
        Regex::new(r"^@@\s-[0-9]+(?:,[0-9]+)?\s\+([0-9]+)(?:,[0-9]+)?\s@@.*$").unwrap();
}

/// One commentable position: 1-based line number in the new revision and the
/// literal line text (without the `+` marker).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffPosition {
    pub line: u32,
    pub content: String,
}

/// Parses one unified-diff blob into its set of commentable positions.
///
/// Accepts `\n`, `\r` and `\r\n` line terminators indiscriminately. A line
/// starting with `@` that does not match the hunk-header grammar is a hard
/// failure: a partially indexed diff would silently demote findings from
/// inline to global.
pub fn positions_from_patch(patch: &str) -> Result<HashSet<DiffPosition>, ParseError> {
    let mut positions = HashSet::new();

    let mut current_line: Option<u32> = None;
    for line in patch.split(['\r', '\n']).filter(|l| !l.is_empty()) {
        if line.starts_with('@') {
            let caps =
                HUNK_HEADER
                    .captures(line)
                    .ok_or_else(|| ParseError::InvalidHunkHeader {
                        line: line.to_string(),
                        patch: patch.to_string(),
                    })?;
            let new_start =
                caps[1]
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidHunkHeader {
                        line: line.to_string(),
                        patch: patch.to_string(),
                    })?;
            current_line = Some(new_start);
        } else if let Some(content) = line.strip_prefix('+') {
            if let Some(n) = current_line {
                positions.insert(DiffPosition {
                    line: n,
                    content: content.to_string(),
                });
                current_line = Some(n + 1);
            }
        } else if line.starts_with(' ') {
            if let Some(n) = current_line {
                current_line = Some(n + 1);
            }
        }
        // '-' and unmarked lines: not part of the new revision, no advance.
    }

    Ok(positions)
}
