//! Run configuration.
//!
//! Everything is environment-driven (the binary loads `.env` first), with the
//! same helper style as the rest of our tooling: `env_bool`/`env_usize` plus
//! required-property validation that fails before any remote call is made.

use std::path::PathBuf;

use crate::errors::{AnnotateResult, ConfigError};
use crate::models::Severity;

/// How the final run status is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    /// Push a persistent commit status to GitLab.
    CommitStatus,
    /// Fail the host process on a failed run; log otherwise.
    ExitCode,
    /// Log only.
    Nothing,
}

impl NotificationMode {
    pub fn of(meaning: &str) -> Option<Self> {
        match meaning {
            "commit-status" => Some(Self::CommitStatus),
            "exit-code" => Some(Self::ExitCode),
            "nothing" => Some(Self::Nothing),
            _ => None,
        }
    }

    pub fn meaning(self) -> &'static str {
        match self {
            Self::CommitStatus => "commit-status",
            Self::ExitCode => "exit-code",
            Self::Nothing => "nothing",
        }
    }
}

/// Commit-status state pushed when a run starts (commit-status mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildInitState {
    Pending,
    Running,
}

impl BuildInitState {
    pub fn of(meaning: &str) -> Option<Self> {
        match meaning {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            _ => None,
        }
    }

    pub fn meaning(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
        }
    }
}

/// Which gate verdicts fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailMode {
    /// Fail only on a hard gate error.
    Error,
    /// Fail on warn as well.
    Warn,
    /// Never fail from the gate verdict alone.
    None,
}

impl GateFailMode {
    pub fn of(meaning: &str) -> Option<Self> {
        match meaning.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" => Some(Self::Warn),
            "NONE" => Some(Self::None),
            _ => None,
        }
    }
}

/// Structured findings-report file schema, written to the repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    None,
    CodeClimate,
    Sast,
}

impl ReportFormat {
    pub fn of(meaning: &str) -> Option<Self> {
        match meaning {
            "none" => Some(Self::None),
            "codeclimate" => Some(Self::CodeClimate),
            "sast" => Some(Self::Sast),
            _ => None,
        }
    }
}

/// GitLab connection and revision context. All fields except `mr_iid` are
/// required for a run to start.
#[derive(Debug, Clone)]
pub struct GitlabConfig {
    /// API base, e.g. "https://gitlab.com/api/v4".
    pub base_api: String,
    pub token: String,
    /// Numeric ID or "group/project".
    pub project: String,
    pub commit_sha: String,
    pub ref_name: String,
    /// Merge request IID; absent for direct-commit runs.
    pub mr_iid: Option<u64>,
    /// Name under which the commit status is pushed.
    pub status_name: String,
}

/// Per-severity maxima; exceeding any of them fails the run even when the
/// gate verdict was acceptable. `None` means unlimited.
#[derive(Debug, Clone)]
pub struct SeverityCaps {
    caps: [Option<usize>; 5],
}

impl SeverityCaps {
    pub fn new(
        info: Option<usize>,
        minor: Option<usize>,
        major: Option<usize>,
        critical: Option<usize>,
        blocker: Option<usize>,
    ) -> Self {
        Self {
            caps: [info, minor, major, critical, blocker],
        }
    }

    pub fn cap(&self, severity: Severity) -> Option<usize> {
        self.caps[severity.rank() as usize]
    }
}

impl Default for SeverityCaps {
    fn default() -> Self {
        // Any new blocker or critical finding fails the run out of the box.
        Self::new(None, None, None, Some(0), Some(0))
    }
}

#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    pub gitlab: GitlabConfig,
    pub notification_mode: NotificationMode,
    pub build_init_state: BuildInitState,
    pub fail_mode: GateFailMode,
    pub report_format: ReportFormat,
    /// Place findings inline when their line is part of the diff.
    pub inline_comments: bool,
    /// Post the run summary as a global comment.
    pub global_comment: bool,
    /// Drop findings whose file is not part of the revision's changed set.
    pub only_changed_files: bool,
    /// Post a "no issues" summary on clean runs; disable to keep clean runs
    /// commentless.
    pub comment_no_findings: bool,
    pub max_inline_comments: usize,
    /// Findings listed in full in the summary; the rest are tallied.
    pub max_global_findings: usize,
    pub severity_caps: SeverityCaps,
    pub project_base_dir: PathBuf,
    pub prefix_directory: Option<String>,
    /// Analysis server base URL, used for rule links in comments.
    pub analysis_url: Option<String>,
}

impl AnnotatorConfig {
    /// Reads the full configuration from the environment and validates the
    /// required GitLab context.
    pub fn from_env() -> AnnotateResult<Self> {
        let gitlab = GitlabConfig {
            base_api: env_required("MR_ANNOTATOR_GITLAB_URL")?,
            token: env_required("MR_ANNOTATOR_GITLAB_TOKEN")?,
            project: env_required("MR_ANNOTATOR_PROJECT")?,
            commit_sha: env_required("MR_ANNOTATOR_COMMIT_SHA")?,
            ref_name: env_required("MR_ANNOTATOR_REF_NAME")?,
            mr_iid: env_parse("MR_ANNOTATOR_MR_IID"),
            status_name: env_string("MR_ANNOTATOR_STATUS_NAME", "mr-annotator"),
        };
        if !gitlab.base_api.starts_with("http://") && !gitlab.base_api.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(gitlab.base_api).into());
        }

        let cfg = Self {
            gitlab,
            notification_mode: env_mode(
                "MR_ANNOTATOR_NOTIFICATION_MODE",
                NotificationMode::CommitStatus,
                NotificationMode::of,
            )?,
            build_init_state: env_mode(
                "MR_ANNOTATOR_BUILD_INIT_STATE",
                BuildInitState::Pending,
                BuildInitState::of,
            )?,
            fail_mode: env_mode("MR_ANNOTATOR_FAIL_MODE", GateFailMode::Error, GateFailMode::of)?,
            report_format: env_mode(
                "MR_ANNOTATOR_REPORT_FORMAT",
                ReportFormat::None,
                ReportFormat::of,
            )?,
            inline_comments: env_bool("MR_ANNOTATOR_INLINE_COMMENTS", true),
            global_comment: env_bool("MR_ANNOTATOR_GLOBAL_COMMENT", true),
            only_changed_files: env_bool("MR_ANNOTATOR_ONLY_CHANGED_FILES", false),
            comment_no_findings: env_bool("MR_ANNOTATOR_COMMENT_NO_FINDINGS", true),
            max_inline_comments: env_usize("MR_ANNOTATOR_MAX_INLINE_COMMENTS", 50),
            max_global_findings: env_usize("MR_ANNOTATOR_MAX_GLOBAL_FINDINGS", 10),
            severity_caps: SeverityCaps::new(
                env_cap("MR_ANNOTATOR_MAX_INFO", None),
                env_cap("MR_ANNOTATOR_MAX_MINOR", None),
                env_cap("MR_ANNOTATOR_MAX_MAJOR", None),
                env_cap("MR_ANNOTATOR_MAX_CRITICAL", Some(0)),
                env_cap("MR_ANNOTATOR_MAX_BLOCKER", Some(0)),
            ),
            project_base_dir: PathBuf::from(env_required("MR_ANNOTATOR_PROJECT_BASE_DIR")?),
            prefix_directory: std::env::var("MR_ANNOTATOR_PREFIX_DIRECTORY").ok(),
            analysis_url: std::env::var("MR_ANNOTATOR_ANALYSIS_URL").ok(),
        };
        Ok(cfg)
    }
}

fn env_required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingProperty(key))
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).ok().unwrap_or_else(|| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Severity cap from the environment; a negative value means unlimited.
fn env_cap(key: &str, default: Option<usize>) -> Option<usize> {
    match std::env::var(key).ok().and_then(|v| v.parse::<i64>().ok()) {
        Some(n) if n < 0 => None,
        Some(n) => Some(n as usize),
        None => default,
    }
}

fn env_mode<T>(
    key: &'static str,
    default: T,
    of: fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) => of(&v).ok_or(ConfigError::UnknownValue {
            property: key,
            value: v,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_mode_round_trips() {
        for mode in [
            NotificationMode::CommitStatus,
            NotificationMode::ExitCode,
            NotificationMode::Nothing,
        ] {
            assert_eq!(NotificationMode::of(mode.meaning()), Some(mode));
        }
        assert_eq!(NotificationMode::of("bogus"), None);
    }

    #[test]
    fn fail_mode_parses_case_insensitively() {
        assert_eq!(GateFailMode::of("warn"), Some(GateFailMode::Warn));
        assert_eq!(GateFailMode::of("ERROR"), Some(GateFailMode::Error));
        assert_eq!(GateFailMode::of("other"), None);
    }

    #[test]
    fn default_caps_reject_any_blocker_or_critical() {
        let caps = SeverityCaps::default();
        assert_eq!(caps.cap(Severity::Blocker), Some(0));
        assert_eq!(caps.cap(Severity::Critical), Some(0));
        assert_eq!(caps.cap(Severity::Major), None);
        assert_eq!(caps.cap(Severity::Info), None);
    }
}
