//! Analysis-side data model: findings and the quality gate.
//!
//! These types are the read-only input of a run. They arrive already parsed
//! (the analysis engine is an external collaborator); everything here derives
//! `Deserialize` so the binary can load a report payload straight from JSON.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity of a finding, least to most severe.
///
/// Ordering between severities goes through [`Severity::rank`], never through
/// the declaration order of the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

impl Severity {
    /// Explicit ranking table; a higher rank is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Minor => 1,
            Severity::Major => 2,
            Severity::Critical => 3,
            Severity::Blocker => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
            Severity::Blocker => "BLOCKER",
        }
    }

    /// All severities, most severe first (reporting order).
    pub fn all_desc() -> [Severity; 5] {
        [
            Severity::Blocker,
            Severity::Critical,
            Severity::Major,
            Severity::Minor,
            Severity::Info,
        ]
    }
}

/// One static-analysis result. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable key of the finding within the analysis run.
    pub key: String,
    /// Identifier of the rule that produced the finding.
    pub rule_key: String,
    /// Grouping key, typically a file/module identity.
    pub component_key: String,
    /// Local (analysis-time) file path, if the finding has one.
    pub file: Option<PathBuf>,
    /// 1-based line in the new revision, if known.
    pub line: Option<u32>,
    pub message: String,
    pub severity: Severity,
    /// True when the finding was introduced since the baseline.
    pub new_finding: bool,
}

/// Aggregate verdict of the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateStatus {
    Ok,
    Warn,
    Error,
    None,
}

/// One metric condition evaluated by the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub status: GateStatus,
    pub metric_key: String,
    pub metric_name: String,
    /// Actual measured value, as reported by the analysis server.
    pub actual: String,
    /// Comparison symbol, e.g. `<` or `>`.
    pub symbol: String,
    pub warning: String,
    pub error: String,
}

/// Quality-gate result: verdict plus the ordered condition list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub status: GateStatus,
    pub conditions: Vec<Condition>,
}

impl Gate {
    /// Count of conditions with the given status.
    pub fn count(&self, status: GateStatus) -> usize {
        self.conditions.iter().filter(|c| c.status == status).count()
    }
}

/// Everything the analysis collaborator hands over for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub gate: Gate,
    pub findings: Vec<Finding>,
}
