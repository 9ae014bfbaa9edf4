//! Structured findings-report files.
//!
//! Optionally serializes the run's findings to the repository root in one of
//! two fixed external schemas, so CI can pick the file up as a quality or
//! security report artifact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::ReportFormat;
use crate::errors::{AnnotateResult, Error};
use crate::models::Finding;

const CODECLIMATE_JSON_NAME: &str = "gl-code-quality-report.json";
const SAST_JSON_NAME: &str = "gl-sast-report.json";

/// Writes the configured report file, returning its path, or `None` when no
/// format is configured.
pub fn write_report(
    format: ReportFormat,
    repo_root: &Path,
    findings: &[Finding],
    analysis_url: Option<&str>,
) -> AnnotateResult<Option<PathBuf>> {
    let (name, json) = match format {
        ReportFormat::None => return Ok(None),
        ReportFormat::CodeClimate => (
            CODECLIMATE_JSON_NAME,
            serde_json::to_string(&code_climate(findings, analysis_url))?,
        ),
        ReportFormat::Sast => (SAST_JSON_NAME, serde_json::to_string(&sast(findings))?),
    };

    let path = repo_root.join(name);
    std::fs::write(&path, json).map_err(|source| Error::ReportFile {
        path: path.display().to_string(),
        source,
    })?;
    debug!("artifacts: wrote {} ({} findings)", path.display(), findings.len());
    Ok(Some(path))
}

#[derive(Serialize)]
struct CodeClimateIssue {
    tool: &'static str,
    fingerprint: String,
    message: String,
    file: String,
    line: String,
    priority: &'static str,
    solution: String,
}

fn code_climate(findings: &[Finding], analysis_url: Option<&str>) -> Vec<CodeClimateIssue> {
    findings
        .iter()
        .map(|f| CodeClimateIssue {
            tool: "mr-annotator",
            fingerprint: f.key.clone(),
            message: f.message.clone(),
            file: file_of(f),
            line: f.line.unwrap_or(0).to_string(),
            priority: f.severity.name(),
            solution: match analysis_url {
                Some(base) => format!(
                    "{}coding_rules#rule_key={}",
                    base,
                    urlencoding::encode(&f.rule_key)
                ),
                None => f.rule_key.clone(),
            },
        })
        .collect()
}

#[derive(Serialize)]
struct SastReport {
    version: &'static str,
    vulnerabilities: Vec<SastVulnerability>,
}

#[derive(Serialize)]
struct SastVulnerability {
    id: String,
    category: &'static str,
    name: String,
    message: String,
    cve: String,
    severity: &'static str,
    location: SastLocation,
}

#[derive(Serialize)]
struct SastLocation {
    file: String,
    start_line: u32,
    end_line: u32,
}

fn sast(findings: &[Finding]) -> SastReport {
    SastReport {
        version: "2.0",
        vulnerabilities: findings
            .iter()
            .map(|f| {
                let line = f.line.unwrap_or(0);
                SastVulnerability {
                    id: f.key.clone(),
                    category: "sast",
                    name: f.rule_key.clone(),
                    message: f.message.clone(),
                    cve: f.key.clone(),
                    severity: f.severity.name(),
                    location: SastLocation {
                        file: file_of(f),
                        start_line: line,
                        end_line: line,
                    },
                }
            })
            .collect(),
    }
}

fn file_of(finding: &Finding) -> String {
    finding
        .file
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| finding.component_key.clone())
}
