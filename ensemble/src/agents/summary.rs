//! Summary stage: synthesis of every recorded analysis.

use anyhow::Result;

use crate::core::analysis::Complexity;
use crate::core::stage::Stage;
use crate::core::state::{RunState, StageDelta, StageReport, SummaryReport};
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::{PromptEngine, StageAnalysis, SummarySnapshot};

const SUMMARY_SYSTEM: &str = "\
You are an expert synthesis analyst. Create a comprehensive, well-structured
summary that integrates all the specialist analyses into a coherent,
actionable report.

Structure your summary with:
1. Executive Summary
2. Key Findings by Domain
3. Cross-Domain Insights
4. Recommendations
5. Conclusion

Make it professional, clear, and actionable.";

pub fn run(
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<StageDelta> {
    let analyses: Vec<StageAnalysis> = state
        .responses
        .iter()
        .map(|(stage, text)| StageAnalysis {
            stage: stage.as_str().to_string(),
            text: text.clone(),
        })
        .collect();
    let (complexity, domain) = match &state.query_analysis {
        Some(analysis) => (complexity_label(analysis.complexity), analysis.domain.clone()),
        None => ("medium".to_string(), "general".to_string()),
    };

    let snapshot = SummarySnapshot {
        query: state.query.clone(),
        analyses,
        stage_count: state.results.len(),
        complexity,
        domain,
    };
    let request = CompletionRequest {
        system: SUMMARY_SYSTEM.to_string(),
        user: engine.summary(&snapshot)?,
    };
    let response = completer.complete(&request)?;

    let report = StageReport::Summary(SummaryReport {
        synthesis_complete: true,
        stages_synthesized: state.responses.keys().copied().collect(),
    });

    let mut delta = StageDelta::new(
        Stage::Summary,
        report,
        response.clone(),
        "Summary stage: synthesis completed".to_string(),
    );
    delta.summary = Some(response);
    Ok(delta)
}

fn complexity_label(complexity: Complexity) -> String {
    match complexity {
        Complexity::Low => "low",
        Complexity::Medium => "medium",
        Complexity::High => "high",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CapturingCompleter {
        last_request: RefCell<Option<CompletionRequest>>,
    }

    impl ChatCompleter for CapturingCompleter {
        fn complete(&self, request: &CompletionRequest) -> Result<String> {
            *self.last_request.borrow_mut() = Some(request.clone());
            Ok("the synthesis".to_string())
        }
    }

    #[test]
    fn synthesizes_all_recorded_responses() {
        let completer = CapturingCompleter {
            last_request: RefCell::new(None),
        };
        let engine = PromptEngine::new();
        let mut state = RunState::new("q", 15);
        state.responses.insert(Stage::Research, "research text".to_string());
        state.responses.insert(Stage::Medical, "medical text".to_string());

        let delta = run(&state, &completer, &engine).expect("run");

        assert_eq!(delta.summary.as_deref(), Some("the synthesis"));
        let request = completer.last_request.borrow().clone().expect("request");
        assert!(request.user.contains("research text"));
        assert!(request.user.contains("MEDICAL ANALYSIS"));
        match delta.report {
            StageReport::Summary(report) => {
                assert!(report.synthesis_complete);
                assert_eq!(report.stages_synthesized, vec![Stage::Research, Stage::Medical]);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }
}
