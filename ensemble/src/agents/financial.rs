//! Financial specialist stage.

use anyhow::Result;

use crate::core::stage::Stage;
use crate::core::state::{RunState, SpecialistReport, StageDelta, StageReport};
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::PromptEngine;

const FINANCIAL_SYSTEM: &str = "\
You are a financial analyst with expertise in markets, investments, economic
trends, and financial planning. Provide comprehensive financial analysis based
on the query and research context.

Include risk assessments, market insights, and actionable recommendations.";

const FINANCIAL_CONFIDENCE: f64 = 0.88;

const DISCLAIMER: &str =
    "Financial analysis for informational purposes. Consult financial advisors \
for investment decisions.";

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
        system: FINANCIAL_SYSTEM.to_string(),
        user: engine.financial(&state.query, research_context)?,
    };
    let response = completer.complete(&request)?;

    let report = StageReport::Specialist(SpecialistReport {
        domain: "financial".to_string(),
        key_insights: vec![
            "Market conditions evaluated".to_string(),
            "Risk factors identified and assessed".to_string(),
            "Strategic recommendations formulated".to_string(),
        ],
        confidence: FINANCIAL_CONFIDENCE,
        disclaimer: DISCLAIMER.to_string(),
    });

    Ok(StageDelta::new(
        Stage::Financial,
        report,
        response,
        "Financial stage: specialist analysis completed".to_string(),
    ))
}
