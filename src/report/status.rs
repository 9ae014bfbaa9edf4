//! Status aggregation.
//!
//! Folds the gate verdict, the configured fail mode and the planner's
//! severity tallies into the single (state, description) pair the
//! notification router dispatches.

use crate::config::GateFailMode;
use crate::models::{Gate, GateStatus};
use crate::report::AnnotationPlan;

/// Final state of a run.
///
/// `Pending`/`Running`/`Success`/`Failed` are the remote platform's own
/// commit-status names. `Aborted` is ours: the run died before a report could
/// be built. It is pushed to the remote under the `failed` wire name but is
/// never equal to `Failed` in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Success,
    Failed,
    Aborted,
}

impl RunState {
    /// Name used in log lines and failure messages.
    pub fn name(self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Success => "success",
            RunState::Failed => "failed",
            RunState::Aborted => "aborted",
        }
    }

    /// State name accepted by the commit-status API.
    pub fn remote_name(self) -> &'static str {
        match self {
            RunState::Aborted => "failed",
            other => other.name(),
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, RunState::Failed | RunState::Aborted)
    }
}

/// Final (state, description) pair of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    pub state: RunState,
    pub description: String,
}

impl RunStatus {
    /// Status for a run that died before a report could be built; the
    /// description is the error text alone.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            state: RunState::Aborted,
            description: message.into(),
        }
    }
}

/// Builds the final status from the gate result and the plan.
///
/// The run fails when the gate verdict trips the configured fail mode, or
/// when any per-severity maximum was exceeded, whichever comes first.
pub fn aggregate(gate: &Gate, plan: &AnnotationPlan, fail_mode: GateFailMode) -> RunStatus {
    let gate_failed = match fail_mode {
        GateFailMode::Error => gate.status == GateStatus::Error,
        GateFailMode::Warn => matches!(gate.status, GateStatus::Error | GateStatus::Warn),
        GateFailMode::None => false,
    };
    let failed = gate_failed || !plan.cap_excesses.is_empty();

    let issue_clause = match plan.reported {
        0 => "reported no issues".to_string(),
        n => format!("reported {n} issues"),
    };
    let description = format!(
        "Quality gate Error:{} Warning:{} Ok:{} {}",
        gate.count(GateStatus::Error),
        gate.count(GateStatus::Warn),
        gate.count(GateStatus::Ok),
        issue_clause
    );

    RunStatus {
        state: if failed { RunState::Failed } else { RunState::Success },
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, Severity};
    use crate::report::CapExcess;

    fn gate(status: GateStatus, statuses: &[GateStatus]) -> Gate {
        Gate {
            status,
            conditions: statuses
                .iter()
                .map(|&s| Condition {
                    status: s,
                    metric_key: "toto".into(),
                    metric_name: "Toto".into(),
                    actual: "10".into(),
                    symbol: "<".into(),
                    warning: "20".into(),
                    error: "30".into(),
                })
                .collect(),
        }
    }

    fn empty_plan(reported: usize) -> AnnotationPlan {
        AnnotationPlan {
            inline: Vec::new(),
            summary: None,
            reported,
            severity_counts: [0; 5],
            cap_excesses: Vec::new(),
            dropped_outside_changeset: 0,
        }
    }

    #[test]
    fn clean_gate_is_success() {
        let status = aggregate(&gate(GateStatus::Ok, &[]), &empty_plan(0), GateFailMode::Error);
        assert_eq!(status.state, RunState::Success);
        assert_eq!(status.description, "Quality gate Error:0 Warning:0 Ok:0 reported no issues");
    }

    #[test]
    fn gate_error_fails_and_description_tallies_conditions() {
        let g = gate(
            GateStatus::Error,
            &[
                GateStatus::Error,
                GateStatus::Warn,
                GateStatus::Warn,
                GateStatus::Ok,
                GateStatus::Ok,
                GateStatus::Ok,
            ],
        );
        let status = aggregate(&g, &empty_plan(2), GateFailMode::Error);
        assert_eq!(status.state, RunState::Failed);
        assert_eq!(
            status.description,
            "Quality gate Error:1 Warning:2 Ok:3 reported 2 issues"
        );
    }

    #[test]
    fn warn_gate_passes_unless_fail_mode_includes_warn() {
        let g = gate(GateStatus::Warn, &[GateStatus::Warn, GateStatus::Ok]);
        let lenient = aggregate(&g, &empty_plan(2), GateFailMode::Error);
        assert_eq!(lenient.state, RunState::Success);
        assert!(lenient.description.contains("Error:0 Warning:1 Ok:1"));

        let strict = aggregate(&g, &empty_plan(2), GateFailMode::Warn);
        assert_eq!(strict.state, RunState::Failed);
    }

    #[test]
    fn warn_gate_with_exceeded_caps_fails_even_when_lenient() {
        let g = gate(GateStatus::Warn, &[GateStatus::Warn, GateStatus::Ok]);
        let mut plan = empty_plan(3);
        plan.cap_excesses.push(CapExcess {
            severity: Severity::Blocker,
            count: 1,
            max: 0,
        });
        let status = aggregate(&g, &plan, GateFailMode::Error);
        assert_eq!(status.state, RunState::Failed);
    }

    #[test]
    fn fail_mode_none_ignores_the_gate_verdict() {
        let g = gate(GateStatus::Error, &[GateStatus::Error]);
        let status = aggregate(&g, &empty_plan(1), GateFailMode::None);
        assert_eq!(status.state, RunState::Success);
    }

    #[test]
    fn aborted_maps_to_failed_on_the_wire_but_stays_distinct() {
        let status = RunStatus::aborted("boom");
        assert_eq!(status.state.remote_name(), "failed");
        assert_ne!(status.state, RunState::Failed);
        assert!(status.state.is_failure());
        assert_eq!(status.description, "boom");
    }
}
