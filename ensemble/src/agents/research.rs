//! Research stage: query classification plus the initial analysis.

use anyhow::Result;
use tracing::debug;

use crate::core::analysis::{QueryAnalysis, parse_analysis};
use crate::core::stage::Stage;
use crate::core::state::{ResearchReport, RunState, StageDelta, StageReport};
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::PromptEngine;

const ANALYZE_SYSTEM: &str = "\
You are an expert query analyzer. Analyze the given query and return a JSON
object with exactly these fields:
- intent: the main purpose (research, analysis, question, ...)
- domain: the subject area (medical, financial, technical, general, ...)
- complexity: one of low, medium, high
- keywords: list of important keywords
- suggested_agents: list of stage names that should handle this query
- estimated_time: rough estimate in minutes

Return only the JSON object.";

const RESEARCH_SYSTEM: &str = "\
You are an expert research analyst. Conduct comprehensive research on the
given query. Provide detailed findings, identify key areas for investigation,
and suggest follow-up actions. Format your response as a structured analysis
with clear sections.";

const RESEARCH_CONFIDENCE: f64 = 0.90;

/// Run the research stage.
///
/// When no classification exists yet, one extra completion call produces it;
/// an unusable payload degrades to the deterministic default rather than
/// failing the stage.
pub fn run(
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<StageDelta> {
    let analysis = match &state.query_analysis {
        Some(analysis) => analysis.clone(),
        None => classify(state, completer, engine)?,
    };

    let request = CompletionRequest {
        system: RESEARCH_SYSTEM.to_string(),
        user: engine.research(&state.query, &analysis)?,
    };
    let response = completer.complete(&request)?;

    let mut followups = analysis.suggested_agents.clone();
    if let Some(specialist) = analysis.specialist_hint() {
        let name = specialist.as_str().to_string();
        if !followups.contains(&name) {
            followups.push(name);
        }
    }

    let report = StageReport::Research(ResearchReport {
        findings: vec![
            "Comprehensive analysis completed".to_string(),
            "Key insights and patterns identified".to_string(),
            "Specialist areas flagged for deeper analysis".to_string(),
        ],
        confidence: RESEARCH_CONFIDENCE,
        recommended_followups: followups,
    });

    let mut delta = StageDelta::new(
        Stage::Research,
        report,
        response,
        "Research stage: analysis completed".to_string(),
    );
    delta.analysis = Some(analysis);
    Ok(delta)
}

fn classify(
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<QueryAnalysis> {
    let request = CompletionRequest {
        system: ANALYZE_SYSTEM.to_string(),
        user: engine.analyze(&state.query)?,
    };
    let reply = completer.complete(&request)?;
    let analysis = parse_analysis(&reply, &state.query);
    debug!(domain = %analysis.domain, complexity = ?analysis.complexity, "query classified");
    Ok(analysis)
}
