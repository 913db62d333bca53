//! Repair stage: quality assurance over everything produced so far.

use anyhow::Result;
use tracing::info;

use crate::core::quality;
use crate::core::stage::Stage;
use crate::core::state::{RepairReport, RunState, StageDelta, StageReport};
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::{PromptEngine, RepairSnapshot};

const REPAIR_SYSTEM: &str = "\
You are a quality assurance specialist. Analyze the current workflow state and
results to identify potential errors or inconsistencies, missing information
or gaps, quality issues in the analysis, and recommendations for improvements.
Provide specific, actionable feedback for each identified issue.";

/// Run the repair stage.
///
/// The collaborator contributes a free-text assessment; the recorded verdict,
/// issue list, and score come from the deterministic checks in
/// [`crate::core::quality`].
pub fn run(
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<StageDelta> {
    let snapshot = RepairSnapshot {
        query: state.query.clone(),
        completed_stages: state.completed_stages().iter().map(|s| s.to_string()).collect(),
        iteration: state.iteration_count,
        response_count: state.responses.len(),
    };
    let request = CompletionRequest {
        system: REPAIR_SYSTEM.to_string(),
        user: engine.repair(&snapshot)?,
    };
    let response = completer.complete(&request)?;

    let check = quality::inspect(&state.query, &state.results, state.iteration_count);
    let verdict = check.verdict();
    let score = check.score();
    info!(issues = check.repair_actions.len(), score, "repair stage: checks evaluated");

    let report = StageReport::Repair(RepairReport {
        issues_found: check.repair_actions.len(),
        quality_issues: check.quality_issues,
        repair_actions: check.repair_actions,
        status: verdict,
        overall_assessment: verdict.describe().to_string(),
        quality_score: score,
    });

    Ok(StageDelta::new(
        Stage::Repair,
        report,
        response,
        format!("Repair stage: {}", verdict.describe()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quality::RepairVerdict;
    use crate::core::state::{SpecialistReport, StageReport};

    struct SingleReply;

    impl ChatCompleter for SingleReply {
        fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok("assessment text".to_string())
        }
    }

    #[test]
    fn clean_state_reports_all_systems_normal() {
        let engine = PromptEngine::new();
        let state = RunState::new("review harvest yields", 15);

        let delta = run(&state, &SingleReply, &engine).expect("run");

        match delta.report {
            StageReport::Repair(report) => {
                assert_eq!(report.status, RepairVerdict::AllSystemsNormal);
                assert_eq!(report.issues_found, 0);
                assert_eq!(report.quality_score, 10);
            }
            other => panic!("unexpected report {other:?}"),
        }
        assert!(delta.message.contains("All quality checks passed"));
    }

    #[test]
    fn low_confidence_results_are_flagged() {
        let engine = PromptEngine::new();
        let mut state = RunState::new("medical review", 15);
        state.results.insert(
            Stage::Medical,
            StageReport::Specialist(SpecialistReport {
                domain: "medical/pharmaceutical".to_string(),
                key_insights: Vec::new(),
                confidence: 0.4,
                disclaimer: String::new(),
            }),
        );

        let delta = run(&state, &SingleReply, &engine).expect("run");

        match delta.report {
            StageReport::Repair(report) => {
                assert_eq!(report.status, RepairVerdict::MinorIssuesDetected);
                assert!(report.quality_issues.contains(&"medical_low_confidence".to_string()));
                assert_eq!(report.quality_score, 8);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }
}
