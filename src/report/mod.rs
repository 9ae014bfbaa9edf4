//! Annotation planning.
//!
//! Converts the ordered finding list plus the revision's diff indexes into a
//! concrete posting plan:
//! 1) Findings on files outside the changed set are dropped when configured;
//! 2) Findings whose line is a commentable diff position go inline, grouped
//!    per file+line into a single body;
//! 3) Everything else falls into the global summary comment;
//! 4) Per-severity maxima are tallied here so the status aggregation can fail
//!    the run on volume alone.
//!
//! The plan is a run-local value, never persisted.

pub mod render;
pub mod status;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::AnnotatorConfig;
use crate::models::{Finding, Severity};
use crate::patch::DiffPosition;
use crate::paths::PathResolver;
use render::{CommentRenderer, RenderContext, SummaryReport};

/// Commentable positions per platform path.
pub type DiffIndex = HashMap<String, HashSet<DiffPosition>>;

/// One inline comment to post: platform path, 1-based line, rendered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAnnotation {
    pub path: String,
    pub line: u32,
    pub body: String,
}

/// A severity whose reported count exceeds its configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapExcess {
    pub severity: Severity,
    pub count: usize,
    pub max: usize,
}

/// Output of the planner, consumed by the posting loop and the status
/// aggregation.
#[derive(Debug)]
pub struct AnnotationPlan {
    pub inline: Vec<InlineAnnotation>,
    /// Rendered global summary body, when one should be posted.
    pub summary: Option<String>,
    /// In-scope findings, inline and global.
    pub reported: usize,
    /// In-scope finding count per severity rank.
    pub severity_counts: [usize; 5],
    pub cap_excesses: Vec<CapExcess>,
    /// Findings dropped because their file is not part of the revision.
    pub dropped_outside_changeset: usize,
}

/// Builds the posting plan for one run. `findings` must already be in
/// reporting order.
pub fn build_plan(
    cfg: &AnnotatorConfig,
    findings: &[Finding],
    resolver: &PathResolver,
    index: &DiffIndex,
    renderer: &dyn CommentRenderer,
    ctx: &RenderContext,
) -> AnnotationPlan {
    // Scope: resolve paths once, drop findings outside the changed set.
    let mut in_scope: Vec<(&Finding, Option<String>)> = Vec::with_capacity(findings.len());
    let mut dropped = 0usize;
    for finding in findings {
        let path = finding.file.as_deref().and_then(|f| resolver.platform_path(f));
        if cfg.only_changed_files {
            if let Some(p) = &path {
                if !index.contains_key(p) {
                    dropped += 1;
                    continue;
                }
            }
        }
        in_scope.push((finding, path));
    }

    let mut severity_counts = [0usize; 5];
    for (finding, _) in &in_scope {
        severity_counts[finding.severity.rank() as usize] += 1;
    }

    // Group inline-eligible findings by file+line, preserving report order.
    let mut groups: Vec<((String, u32), Vec<&Finding>)> = Vec::new();
    let mut group_index: HashMap<(String, u32), usize> = HashMap::new();
    let mut unplaced: Vec<&Finding> = Vec::new();
    for (finding, path) in &in_scope {
        let anchor = match (cfg.inline_comments, path, finding.line) {
            (true, Some(path), Some(line)) if has_position(index, path, line) => {
                Some((path.clone(), line))
            }
            _ => None,
        };
        match anchor {
            Some(key) => match group_index.get(&key) {
                Some(&i) => groups[i].1.push(*finding),
                None => {
                    group_index.insert(key.clone(), groups.len());
                    groups.push((key, vec![*finding]));
                }
            },
            None => unplaced.push(*finding),
        }
    }

    // Inline volume cap: overflowing groups fall back to the summary.
    if groups.len() > cfg.max_inline_comments {
        debug!(
            "plan: inline cap reached, {} group(s) fall back to the summary",
            groups.len() - cfg.max_inline_comments
        );
        for (_, members) in groups.drain(cfg.max_inline_comments..) {
            unplaced.extend(members);
        }
    }

    let inline: Vec<InlineAnnotation> = groups
        .iter()
        .map(|((path, line), members)| InlineAnnotation {
            path: path.clone(),
            line: *line,
            body: renderer.inline_comment(members, ctx),
        })
        .collect();

    let reported = in_scope.len();
    let summary = if cfg.global_comment && (reported > 0 || cfg.comment_no_findings) {
        let report = SummaryReport {
            severity_counts,
            reported,
            unplaced,
            max_listed: cfg.max_global_findings,
        };
        Some(renderer.summary_comment(&report, ctx))
    } else {
        None
    };

    let cap_excesses = Severity::all_desc()
        .into_iter()
        .filter_map(|severity| {
            let count = severity_counts[severity.rank() as usize];
            match cfg.severity_caps.cap(severity) {
                Some(max) if count > max => Some(CapExcess {
                    severity,
                    count,
                    max,
                }),
                _ => None,
            }
        })
        .collect();

    debug!(
        "plan: reported={} inline={} dropped={} summary={}",
        reported,
        inline.len(),
        dropped,
        summary.is_some()
    );

    AnnotationPlan {
        inline,
        summary,
        reported,
        severity_counts,
        cap_excesses,
        dropped_outside_changeset: dropped,
    }
}

fn has_position(index: &DiffIndex, path: &str, line: u32) -> bool {
    index
        .get(path)
        .map(|positions| positions.iter().any(|p| p.line == line))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::render::MarkdownRenderer;
    use std::path::PathBuf;

    use crate::config::{
        BuildInitState, GateFailMode, GitlabConfig, NotificationMode, ReportFormat, SeverityCaps,
    };

    fn config() -> AnnotatorConfig {
        AnnotatorConfig {
            gitlab: GitlabConfig {
                base_api: "https://gitlab.example.com/api/v4".into(),
                token: "t".into(),
                project: "group/project".into(),
                commit_sha: "abc123".into(),
                ref_name: "main".into(),
                mr_iid: Some(7),
                status_name: "mr-annotator".into(),
            },
            notification_mode: NotificationMode::CommitStatus,
            build_init_state: BuildInitState::Pending,
            fail_mode: GateFailMode::Error,
            report_format: ReportFormat::None,
            inline_comments: true,
            global_comment: true,
            only_changed_files: false,
            comment_no_findings: true,
            max_inline_comments: 50,
            max_global_findings: 10,
            severity_caps: SeverityCaps::new(None, None, None, None, None),
            project_base_dir: PathBuf::from("/repo"),
            prefix_directory: None,
            analysis_url: None,
        }
    }

    fn finding(path: Option<&str>, line: Option<u32>, severity: Severity) -> Finding {
        Finding {
            key: "k".into(),
            rule_key: "rule".into(),
            component_key: path.unwrap_or("none").into(),
            file: path.map(PathBuf::from),
            line,
            message: "message".into(),
            severity,
            new_finding: true,
        }
    }

    fn index_of(path: &str, lines: &[u32]) -> DiffIndex {
        let mut index = DiffIndex::new();
        index.insert(
            path.to_string(),
            lines
                .iter()
                .map(|&line| DiffPosition {
                    line,
                    content: format!("line {line}"),
                })
                .collect(),
        );
        index
    }

    fn plan(cfg: &AnnotatorConfig, findings: &[Finding], index: &DiffIndex) -> AnnotationPlan {
        let resolver = PathResolver::with_root(PathBuf::from("/repo"), None);
        build_plan(
            cfg,
            findings,
            &resolver,
            index,
            &MarkdownRenderer,
            &RenderContext::default(),
        )
    }

    #[test]
    fn finding_on_diff_line_goes_inline() {
        let findings = vec![finding(Some("src/a.rs"), Some(4), Severity::Major)];
        let p = plan(&config(), &findings, &index_of("src/a.rs", &[3, 4]));
        assert_eq!(p.inline.len(), 1);
        assert_eq!(p.inline[0].path, "src/a.rs");
        assert_eq!(p.inline[0].line, 4);
        assert_eq!(p.reported, 1);
    }

    #[test]
    fn never_inline_without_a_position_at_that_line() {
        let findings = vec![finding(Some("src/a.rs"), Some(99), Severity::Major)];
        let p = plan(&config(), &findings, &index_of("src/a.rs", &[3, 4]));
        assert!(p.inline.is_empty());
        let summary = p.summary.expect("summary");
        assert!(summary.contains("message"));
    }

    #[test]
    fn same_location_findings_share_one_comment() {
        let findings = vec![
            finding(Some("src/a.rs"), Some(4), Severity::Blocker),
            finding(Some("src/a.rs"), Some(4), Severity::Minor),
        ];
        let p = plan(&config(), &findings, &index_of("src/a.rs", &[4]));
        assert_eq!(p.inline.len(), 1);
        assert!(p.inline[0].body.starts_with("* **BLOCKER**"));
        assert!(p.inline[0].body.contains("* **MINOR**"));
    }

    #[test]
    fn inline_disabled_sends_everything_to_the_summary() {
        let mut cfg = config();
        cfg.inline_comments = false;
        let findings = vec![finding(Some("src/a.rs"), Some(4), Severity::Major)];
        let p = plan(&cfg, &findings, &index_of("src/a.rs", &[4]));
        assert!(p.inline.is_empty());
        assert!(p.summary.is_some());
    }

    #[test]
    fn changed_file_filter_drops_other_files() {
        let mut cfg = config();
        cfg.only_changed_files = true;
        let findings = vec![
            finding(Some("src/a.rs"), Some(4), Severity::Major),
            finding(Some("src/other.rs"), Some(1), Severity::Blocker),
            finding(None, None, Severity::Info),
        ];
        let p = plan(&cfg, &findings, &index_of("src/a.rs", &[4]));
        assert_eq!(p.dropped_outside_changeset, 1);
        assert_eq!(p.reported, 2);
        // The dropped blocker does not count against caps either.
        assert_eq!(p.severity_counts[Severity::Blocker.rank() as usize], 0);
    }

    #[test]
    fn cap_excess_is_reported_per_severity() {
        let mut cfg = config();
        cfg.severity_caps = SeverityCaps::new(None, None, None, None, Some(0));
        let findings = vec![
            finding(Some("src/a.rs"), Some(4), Severity::Blocker),
            finding(Some("src/a.rs"), Some(3), Severity::Major),
        ];
        let p = plan(&cfg, &findings, &index_of("src/a.rs", &[3, 4]));
        assert_eq!(
            p.cap_excesses,
            vec![CapExcess {
                severity: Severity::Blocker,
                count: 1,
                max: 0
            }]
        );
    }

    #[test]
    fn inline_cap_spills_to_the_summary() {
        let mut cfg = config();
        cfg.max_inline_comments = 1;
        let findings = vec![
            finding(Some("src/a.rs"), Some(3), Severity::Major),
            finding(Some("src/a.rs"), Some(4), Severity::Minor),
        ];
        let p = plan(&cfg, &findings, &index_of("src/a.rs", &[3, 4]));
        assert_eq!(p.inline.len(), 1);
        assert_eq!(p.inline[0].line, 3);
        assert!(p.summary.expect("summary").contains("not reported inline"));
    }

    #[test]
    fn clean_run_summary_and_its_suppression() {
        let p = plan(&config(), &[], &DiffIndex::new());
        assert_eq!(p.summary.as_deref(), Some("Analysis reported no issues."));

        let mut cfg = config();
        cfg.comment_no_findings = false;
        let p = plan(&cfg, &[], &DiffIndex::new());
        assert!(p.summary.is_none());
    }

    #[test]
    fn global_comment_disabled_produces_no_summary() {
        let mut cfg = config();
        cfg.global_comment = false;
        let findings = vec![finding(None, None, Severity::Info)];
        let p = plan(&cfg, &findings, &DiffIndex::new());
        assert!(p.summary.is_none());
        // Still counted: disabled commentary does not shrink the report.
        assert_eq!(p.reported, 1);
    }

    #[test]
    fn empty_message_findings_are_still_placed() {
        let mut f = finding(Some("src/a.rs"), Some(4), Severity::Major);
        f.message = String::new();
        f.component_key = String::new();
        let p = plan(&config(), &[f], &index_of("src/a.rs", &[4]));
        assert_eq!(p.inline.len(), 1);
    }
}
