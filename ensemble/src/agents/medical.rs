//! Medical specialist stage.

use anyhow::Result;

use crate::core::stage::Stage;
use crate::core::state::{RunState, SpecialistReport, StageDelta, StageReport};
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::PromptEngine;

const MEDICAL_SYSTEM: &str = "\
You are a medical specialist with expertise in healthcare, pharmaceuticals,
and medical research. Analyze the given query and research context to provide
expert medical insights.

Always include appropriate disclaimers about consulting healthcare
professionals. Focus on factual, evidence-based information.";

const MEDICAL_CONFIDENCE: f64 = 0.92;

const DISCLAIMER: &str = "This analysis is for informational purposes only. \
Always consult qualified healthcare professionals for medical advice.";

pub fn run(
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<StageDelta> {
    let research_context = state
        .responses
        .get(&Stage::Research)
        .map(String::as_str)
        .unwrap_or_default();
    let request = CompletionRequest {
        system: MEDICAL_SYSTEM.to_string(),
        user: engine.medical(&state.query, research_context)?,
    };
    let response = completer.complete(&request)?;

    let report = StageReport::Specialist(SpecialistReport {
        domain: "medical/pharmaceutical".to_string(),
        key_insights: vec![
            "Medical terminology and concepts analyzed".to_string(),
            "Clinical implications assessed".to_string(),
            "Safety and regulatory factors considered".to_string(),
        ],
        confidence: MEDICAL_CONFIDENCE,
        disclaimer: DISCLAIMER.to_string(),
    });

    Ok(StageDelta::new(
        Stage::Medical,
        report,
        response,
        "Medical stage: specialist analysis completed".to_string(),
    ))
}
