//! Deterministic quality checks backing the repair stage.
//!
//! The repair stage pairs a free-text assessment from the collaborator with
//! these local checks. Only the checks influence the recorded verdict and
//! score, so they live in core and stay fully testable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::stage::Stage;
use crate::core::state::StageReport;

/// Confidence below this flags a stage result for review.
pub const CONFIDENCE_FLOOR: f64 = 0.7;

/// Iterations after which a missing summary counts as a gap.
const SUMMARY_EXPECTED_AFTER: u32 = 5;

/// Overall status derived from the number of detected issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairVerdict {
    AllSystemsNormal,
    MinorIssuesDetected,
    SignificantIssuesFound,
}

impl RepairVerdict {
    pub fn for_issue_count(count: usize) -> Self {
        match count {
            0 => RepairVerdict::AllSystemsNormal,
            1..=2 => RepairVerdict::MinorIssuesDetected,
            _ => RepairVerdict::SignificantIssuesFound,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RepairVerdict::AllSystemsNormal => "All quality checks passed successfully",
            RepairVerdict::MinorIssuesDetected => "Minor issues detected, workflow can continue",
            RepairVerdict::SignificantIssuesFound => "Significant issues require attention",
        }
    }
}

/// Outcome of the deterministic inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityCheck {
    /// Actionable descriptions, one per detected issue.
    pub repair_actions: Vec<String>,
    /// Stable issue identifiers, parallel to `repair_actions`.
    pub quality_issues: Vec<String>,
}

impl QualityCheck {
    pub fn verdict(&self) -> RepairVerdict {
        RepairVerdict::for_issue_count(self.repair_actions.len())
    }

    /// 10 minus two per issue, clamped to at least 1.
    pub fn score(&self) -> u8 {
        10u8.saturating_sub((self.repair_actions.len() as u8).saturating_mul(2)).max(1)
    }
}

/// Inspect the run so far for gaps and low-confidence results.
pub fn inspect(
    query: &str,
    results: &BTreeMap<Stage, StageReport>,
    iteration_count: u32,
) -> QualityCheck {
    let mut repair_actions = Vec::new();
    let mut quality_issues = Vec::new();

    for (stage, report) in results {
        if let Some(confidence) = report.confidence()
            && confidence < CONFIDENCE_FLOOR
        {
            repair_actions.push(format!(
                "Low confidence in {stage} analysis ({confidence:.2}) - recommend review"
            ));
            quality_issues.push(format!("{stage}_low_confidence"));
        }
    }

    let query_lower = query.to_lowercase();
    if query_lower.contains("medical") && !results.contains_key(&Stage::Medical) {
        repair_actions.push("Medical query detected but no medical analysis found".to_string());
        quality_issues.push("missing_medical_analysis".to_string());
    }
    if query_lower.contains("financial") && !results.contains_key(&Stage::Financial) {
        repair_actions.push("Financial query detected but no financial analysis found".to_string());
        quality_issues.push("missing_financial_analysis".to_string());
    }

    if iteration_count > SUMMARY_EXPECTED_AFTER && !results.contains_key(&Stage::Summary) {
        repair_actions
            .push("Workflow progressed significantly but no summary generated".to_string());
        quality_issues.push("missing_summary".to_string());
    }

    QualityCheck {
        repair_actions,
        quality_issues,
    }
}
