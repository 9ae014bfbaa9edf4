//! Comment rendering.
//!
//! The engine never depends on a concrete templating technology: everything
//! that turns findings into comment text goes through [`CommentRenderer`],
//! and [`MarkdownRenderer`] is the built-in plain-markdown implementation.

use crate::gitlab::blob_url;
use crate::models::{Finding, Severity};

/// Run-level context available to every render call.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Revision the comments are attached to.
    pub revision: String,
    /// Analysis server base URL; enables rule links when present.
    pub analysis_url: Option<String>,
    /// Project web URL; enables blob links in the summary when present.
    pub project_web_url: Option<String>,
}

/// Facts the summary comment is built from.
#[derive(Debug)]
pub struct SummaryReport<'a> {
    /// Count of reported findings per severity rank.
    pub severity_counts: [usize; 5],
    /// Total reported findings, inline and global.
    pub reported: usize,
    /// Findings that could not be placed inline, in reporting order.
    pub unplaced: Vec<&'a Finding>,
    /// How many unplaced findings are listed in full; the rest are tallied.
    pub max_listed: usize,
}

pub trait CommentRenderer {
    /// Body of one inline comment for all findings sharing a file and line.
    fn inline_comment(&self, findings: &[&Finding], ctx: &RenderContext) -> String;

    /// Body of the run's global summary comment.
    fn summary_comment(&self, report: &SummaryReport<'_>, ctx: &RenderContext) -> String;
}

/// Default renderer: plain markdown, one line per finding, bulleted when a
/// location carries more than one.
#[derive(Debug, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn print_finding(&self, finding: &Finding, link_location: bool, ctx: &RenderContext) -> String {
        let mut out = format!("**{}**", finding.severity.name());

        let location = match (&finding.file, finding.line, &ctx.project_web_url) {
            (Some(file), line, Some(web_url)) if link_location => Some(blob_url(
                web_url,
                &ctx.revision,
                &file.to_string_lossy(),
                line,
            )),
            _ => None,
        };
        match location {
            Some(url) => out.push_str(&format!(" [{}]({})", finding.message, url)),
            None => out.push_str(&format!(" {}", finding.message)),
        }

        match &ctx.analysis_url {
            Some(base) => out.push_str(&format!(
                " [{}]({}coding_rules#rule_key={})",
                finding.rule_key,
                base,
                urlencoding::encode(&finding.rule_key)
            )),
            None => out.push_str(&format!(" ({})", finding.rule_key)),
        }
        out
    }
}

impl CommentRenderer for MarkdownRenderer {
    fn inline_comment(&self, findings: &[&Finding], ctx: &RenderContext) -> String {
        findings
            .iter()
            .map(|f| self.print_finding(f, false, ctx))
            .map(|line| {
                if findings.len() > 1 {
                    format!("* {line}")
                } else {
                    line
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn summary_comment(&self, report: &SummaryReport<'_>, ctx: &RenderContext) -> String {
        if report.reported == 0 {
            return "Analysis reported no issues.".to_string();
        }

        let mut out = format!(
            "Analysis reported {} issue{}\n",
            report.reported,
            if report.reported > 1 { "s" } else { "" }
        );
        for severity in Severity::all_desc() {
            let count = report.severity_counts[severity.rank() as usize];
            if count > 0 {
                out.push_str(&format!("* {} {}\n", count, severity.name().to_lowercase()));
            }
        }

        if !report.unplaced.is_empty() {
            out.push_str("\nIssues not reported inline:\n");
            for finding in report.unplaced.iter().take(report.max_listed) {
                out.push_str(&format!("1. {}\n", self.print_finding(finding, true, ctx)));
            }
            if report.unplaced.len() > report.max_listed {
                out.push_str(&format!(
                    "* ... {} more\n",
                    report.unplaced.len() - report.max_listed
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn finding(severity: Severity, message: &str, line: Option<u32>) -> Finding {
        Finding {
            key: "k".into(),
            rule_key: "squid:S100".into(),
            component_key: "mod:src/a.rs".into(),
            file: Some(PathBuf::from("src/a.rs")),
            line,
            message: message.into(),
            severity,
            new_finding: true,
        }
    }

    #[test]
    fn single_finding_is_not_bulleted() {
        let f = finding(Severity::Major, "avoid this", Some(3));
        let body = MarkdownRenderer.inline_comment(&[&f], &RenderContext::default());
        assert_eq!(body, "**MAJOR** avoid this (squid:S100)");
    }

    #[test]
    fn multiple_findings_render_as_bullets() {
        let a = finding(Severity::Major, "first", Some(3));
        let b = finding(Severity::Minor, "second", Some(3));
        let body = MarkdownRenderer.inline_comment(&[&a, &b], &RenderContext::default());
        assert_eq!(
            body,
            "* **MAJOR** first (squid:S100)\n* **MINOR** second (squid:S100)"
        );
    }

    #[test]
    fn rule_link_uses_the_analysis_url() {
        let f = finding(Severity::Info, "note", None);
        let ctx = RenderContext {
            analysis_url: Some("http://myserver/".into()),
            ..Default::default()
        };
        let body = MarkdownRenderer.inline_comment(&[&f], &ctx);
        assert!(body.contains("[squid:S100](http://myserver/coding_rules#rule_key=squid%3AS100)"));
    }

    #[test]
    fn empty_summary_message() {
        let report = SummaryReport {
            severity_counts: [0; 5],
            reported: 0,
            unplaced: Vec::new(),
            max_listed: 10,
        };
        assert_eq!(
            MarkdownRenderer.summary_comment(&report, &RenderContext::default()),
            "Analysis reported no issues."
        );
    }

    #[test]
    fn summary_lists_counts_and_caps_the_listing() {
        let findings: Vec<Finding> = (0..3)
            .map(|i| finding(Severity::Major, &format!("issue {i}"), Some(i + 1)))
            .collect();
        let report = SummaryReport {
            severity_counts: [0, 0, 3, 0, 0],
            reported: 3,
            unplaced: findings.iter().collect(),
            max_listed: 2,
        };
        let body = MarkdownRenderer.summary_comment(&report, &RenderContext::default());
        assert!(body.starts_with("Analysis reported 3 issues"));
        assert!(body.contains("* 3 major"));
        assert!(body.contains("issue 0"));
        assert!(body.contains("issue 1"));
        assert!(!body.contains("issue 2"));
        assert!(body.contains("* ... 1 more"));
    }

    #[test]
    fn summary_links_to_the_blob_when_web_url_is_known() {
        let f = finding(Severity::Critical, "bad", Some(9));
        let ctx = RenderContext {
            revision: "abc123".into(),
            analysis_url: None,
            project_web_url: Some("https://gitlab.com/g/p".into()),
        };
        let report = SummaryReport {
            severity_counts: [0, 0, 0, 1, 0],
            reported: 1,
            unplaced: vec![&f],
            max_listed: 10,
        };
        let body = MarkdownRenderer.summary_comment(&report, &ctx);
        assert!(body.contains("[bad](https://gitlab.com/g/p/blob/abc123/src/a.rs#L9)"));
    }
}
