//! Deterministic ordering of findings.
//!
//! One total order used everywhere findings are sequenced (grouping,
//! iteration, comment rendering), so identical finding sets always render in
//! identical order across runs. Most severe first, then grouping key, then
//! line.

use std::cmp::Ordering;

use crate::models::Finding;

/// Total-order comparator, tolerant of absent findings so it stays a valid
/// comparator for sorting utilities: an absent finding sorts after any
/// present one.
pub fn compare(left: Option<&Finding>, right: Option<&Finding>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => compare_present(l, r),
    }
}

/// Sorts findings in place into reporting order.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|l, r| compare_present(l, r));
}

fn compare_present(left: &Finding, right: &Finding) -> Ordering {
    // Higher severity rank sorts first.
    match right.severity.rank().cmp(&left.severity.rank()) {
        Ordering::Equal => {}
        other => return other,
    }
    // Same severity: group findings from the same component together.
    match left.component_key.cmp(&right.component_key) {
        Ordering::Equal => {}
        other => return other,
    }
    compare_lines(left.line, right.line)
}

fn compare_lines(left: Option<u32>, right: Option<u32>) -> Ordering {
    match (left, right) {
        (l, r) if l == r => Ordering::Equal,
        (None, _) => Ordering::Less,
        (_, None) => Ordering::Greater,
        (Some(l), Some(r)) => l.cmp(&r),
    }
}
