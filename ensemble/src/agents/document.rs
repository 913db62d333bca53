//! Document stage: renders the final document suite and ends the run.
//!
//! Three completion calls (structure planning, executive-summary content,
//! collection metadata) feed locally rendered documents: executive summary,
//! main report, per-specialist reports, technical export, quality-assurance
//! report, and methodology. The delta carries the documents and the
//! completion flag; writing files is the run loop's job.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::core::stage::Stage;
use crate::core::state::{
    Document, DocumentFormat, DocumentReport, RepairReport, RunState, StageDelta, StageReport,
};
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::{DocumentSnapshot, ExecutiveSnapshot, PromptEngine};

const PLANNING_SYSTEM: &str = "\
You are an expert document architect and technical writer. Create a document
structure and organization plan for the analysis results: a logical document
hierarchy, content organization strategy, executive summary approach, and
professional formatting recommendations.";

const EXECUTIVE_SYSTEM: &str = "\
You are an executive summary specialist. Create a concise, high-level
executive summary that captures the key insights, findings, and
recommendations from the analysis. Format it for decision-makers and focus on
actionable insights and strategic implications.";

const METADATA_SYSTEM: &str = "\
You are a metadata specialist. Generate comprehensive document metadata in
JSON format.";

/// How much of the synthesis the executive-summary prompt quotes.
const SUMMARY_EXCERPT_LEN: usize = 500;

pub fn run(
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<StageDelta> {
    let generated_at = Local::now();
    let sections: Vec<String> = state.completed_stages().iter().map(|s| s.to_string()).collect();

    let planning_response = completer.complete(&CompletionRequest {
        system: PLANNING_SYSTEM.to_string(),
        user: engine.document_plan(&DocumentSnapshot {
            query: state.query.clone(),
            sections: sections.clone(),
            has_summary: !state.summary.is_empty(),
            document_types: Vec::new(),
            total_documents: 0,
        })?,
    })?;

    let executive_content = completer.complete(&CompletionRequest {
        system: EXECUTIVE_SYSTEM.to_string(),
        user: engine.executive_summary(&ExecutiveSnapshot {
            query: state.query.clone(),
            sections: sections.clone(),
            summary_excerpt: excerpt(&state.summary, SUMMARY_EXCERPT_LEN),
        })?,
    })?;

    let mut documents = Vec::new();
    documents.push(build_executive_summary(&state.query, executive_content));
    documents.push(build_main_report(state, generated_at));
    for (stage, report) in &state.results {
        if let StageReport::Specialist(_) | StageReport::Research(_) = report {
            documents.push(build_specialist_report(
                *stage,
                report,
                state.responses.get(stage).map(String::as_str).unwrap_or_default(),
                generated_at,
            ));
        }
    }
    documents.push(build_technical_export(state)?);
    if let Some(StageReport::Repair(repair)) = state.results.get(&Stage::Repair) {
        documents.push(build_qa_report(
            repair,
            state.responses.get(&Stage::Repair).map(String::as_str).unwrap_or_default(),
            generated_at,
        ));
    }
    documents.push(build_methodology(state, generated_at));

    let document_types: Vec<String> = documents.iter().map(|doc| doc.doc_type.clone()).collect();
    let metadata = completer.complete(&CompletionRequest {
        system: METADATA_SYSTEM.to_string(),
        user: engine.document_metadata(&DocumentSnapshot {
            query: state.query.clone(),
            sections,
            has_summary: !state.summary.is_empty(),
            document_types: document_types.clone(),
            total_documents: documents.len(),
        })?,
    })?;

    let report = StageReport::Documents(DocumentReport {
        total_documents: documents.len(),
        document_types,
        metadata,
    });

    let mut delta = StageDelta::new(
        Stage::Document,
        report,
        planning_response,
        format!("Document stage: {} documents prepared", documents.len()),
    );
    delta.documents = documents;
    delta.completes_run = true;
    Ok(delta)
}

fn build_executive_summary(query: &str, content: String) -> Document {
    Document {
        doc_type: "executive_summary".to_string(),
        title: format!("Executive Summary: {query}"),
        content,
        format: DocumentFormat::Markdown,
    }
}

fn build_main_report(state: &RunState, generated_at: DateTime<Local>) -> Document {
    let mut content = format!(
        "# Comprehensive Analysis Report\n\n**Query:** {}\n**Analysis Date:** {}\n\n",
        state.query,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    if !state.summary.is_empty() {
        content.push_str(&format!("## Executive Summary\n\n{}\n\n", state.summary));
    }
    content.push_str("## Detailed Analysis by Stage\n\n");
    for (stage, response) in &state.responses {
        if *stage == Stage::Document {
            continue;
        }
        content.push_str(&format!("### {} Analysis\n\n{response}\n\n", title_case(stage.as_str())));
    }
    content.push_str(
        "## Methodology\n\n\
         - **Research:** initial analysis and information gathering\n\
         - **Specialists:** domain-specific expertise (medical, financial)\n\
         - **Quality Assurance:** validation and error detection\n\
         - **Synthesis:** integration of all findings\n\
         - **Documentation:** structured final deliverables\n",
    );

    Document {
        doc_type: "main_report".to_string(),
        title: format!("Comprehensive Analysis: {}", state.query),
        content,
        format: DocumentFormat::Markdown,
    }
}

fn build_specialist_report(
    stage: Stage,
    report: &StageReport,
    response: &str,
    generated_at: DateTime<Local>,
) -> Document {
    let stage_title = title_case(stage.as_str());
    let confidence = report.confidence().unwrap_or_default();
    let mut content = format!(
        "# {stage_title} Specialist Report\n\n**Domain:** {stage_title}\n**Analysis Date:** {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    if !response.is_empty() {
        content.push_str(&format!("## Analysis\n\n{response}\n\n"));
    }
    content.push_str(&format!(
        "## Quality Metrics\n\n- **Confidence Level:** {:.0}%\n- **Validation:** {}\n",
        confidence * 100.0,
        if confidence > 0.8 { "Passed" } else { "Requires Review" }
    ));

    Document {
        doc_type: format!("{stage}_specialist_report"),
        title: format!("{stage_title} Analysis Report"),
        content,
        format: DocumentFormat::Markdown,
    }
}

/// Full-state JSON export, minus the bulky raw response texts.
fn build_technical_export(state: &RunState) -> Result<Document> {
    let mut value = serde_json::to_value(state).context("serialize state for export")?;
    if let Some(object) = value.as_object_mut() {
        object.remove("responses");
        object.remove("documents");
    }
    let content =
        serde_json::to_string_pretty(&value).context("render technical export")?;
    Ok(Document {
        doc_type: "technical_export".to_string(),
        title: "Technical Data Export".to_string(),
        content,
        format: DocumentFormat::Json,
    })
}

fn build_qa_report(
    repair: &RepairReport,
    assessment: &str,
    generated_at: DateTime<Local>,
) -> Document {
    let mut content = format!(
        "# Quality Assurance Report\n\n**Assessment Date:** {}\n\n## Overall Assessment\n\n\
         **Status:** {}\n**Quality Score:** {}/10\n**Issues Found:** {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        repair.overall_assessment,
        repair.quality_score,
        repair.issues_found
    );
    if !repair.repair_actions.is_empty() {
        content.push_str("## Issues and Recommendations\n\n");
        for (idx, action) in repair.repair_actions.iter().enumerate() {
            content.push_str(&format!("{}. {action}\n", idx + 1));
        }
        content.push('\n');
    }
    if !assessment.is_empty() {
        content.push_str(&format!("## Assessment Notes\n\n{assessment}\n"));
    }

    Document {
        doc_type: "quality_assurance_report".to_string(),
        title: "Quality Assurance and Validation Report".to_string(),
        content,
        format: DocumentFormat::Markdown,
    }
}

fn build_methodology(state: &RunState, generated_at: DateTime<Local>) -> Document {
    let quality_score = match state.results.get(&Stage::Repair) {
        Some(StageReport::Repair(repair)) => format!("{}/10", repair.quality_score),
        _ => "n/a".to_string(),
    };
    let content = format!(
        "# Analysis Methodology\n\n**Generated:** {}\n\n## System Architecture\n\n\
         - **Supervisor:** central coordinator managing routing decisions\n\
         - **Research:** primary research and initial analysis\n\
         - **Medical:** medical and pharmaceutical domain expertise\n\
         - **Financial:** financial analysis and market insights\n\
         - **Repair:** quality assurance and error detection\n\
         - **Summary:** synthesis and comprehensive reporting\n\
         - **Document:** document structuring and organization\n\n\
         ## Process Flow\n\n\
         1. Query classification and routing strategy\n\
         2. Research phase\n\
         3. Specialist analysis\n\
         4. Quality assurance\n\
         5. Synthesis\n\
         6. Report generation\n\n\
         ## Execution Statistics\n\n\
         - **Total Iterations:** {}\n\
         - **Stages Activated:** {}\n\
         - **Quality Score:** {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        state.iteration_count,
        state.results.len(),
        quality_score
    );

    Document {
        doc_type: "methodology_document".to_string(),
        title: "Analysis Methodology and Process Documentation".to_string(),
        content,
        format: DocumentFormat::Markdown,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quality::RepairVerdict;
    use crate::core::state::{ResearchReport, SummaryReport};
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedCompleter {
        replies: RefCell<VecDeque<String>>,
    }

    impl ScriptedCompleter {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    impl ChatCompleter for ScriptedCompleter {
        fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| anyhow!("scripted replies exhausted"))
        }
    }

    fn populated_state() -> RunState {
        let mut state = RunState::new("study orbital debris", 15);
        state.results.insert(
            Stage::Research,
            StageReport::Research(ResearchReport {
                findings: Vec::new(),
                confidence: 0.9,
                recommended_followups: Vec::new(),
            }),
        );
        state.results.insert(
            Stage::Summary,
            StageReport::Summary(SummaryReport {
                synthesis_complete: true,
                stages_synthesized: vec![Stage::Research],
            }),
        );
        state.responses.insert(Stage::Research, "research body".to_string());
        state.summary = "the synthesis".to_string();
        state.iteration_count = 4;
        state
    }

    #[test]
    fn produces_the_document_suite_and_completes_the_run() {
        let completer = ScriptedCompleter::new(&["plan", "executive content", "metadata json"]);
        let engine = PromptEngine::new();
        let state = populated_state();

        let delta = run(&state, &completer, &engine).expect("run");

        assert!(delta.completes_run);
        assert_eq!(delta.stage, Stage::Document);
        let types: Vec<&str> = delta.documents.iter().map(|d| d.doc_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "executive_summary",
                "main_report",
                "research_specialist_report",
                "technical_export",
                "methodology_document"
            ]
        );
        match &delta.report {
            StageReport::Documents(report) => {
                assert_eq!(report.total_documents, 5);
                assert_eq!(report.metadata, "metadata json");
            }
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn qa_report_appears_when_repair_ran() {
        let completer = ScriptedCompleter::new(&["plan", "executive content", "metadata json"]);
        let engine = PromptEngine::new();
        let mut state = populated_state();
        state.results.insert(
            Stage::Repair,
            StageReport::Repair(RepairReport {
                issues_found: 1,
                quality_issues: vec!["missing_summary".to_string()],
                repair_actions: vec!["generate a summary".to_string()],
                status: RepairVerdict::MinorIssuesDetected,
                overall_assessment: "Minor issues detected, workflow can continue".to_string(),
                quality_score: 8,
            }),
        );

        let delta = run(&state, &completer, &engine).expect("run");

        let qa = delta
            .documents
            .iter()
            .find(|doc| doc.doc_type == "quality_assurance_report")
            .expect("qa report");
        assert!(qa.content.contains("Quality Score:** 8/10"));
        assert!(qa.content.contains("generate a summary"));
    }

    #[test]
    fn technical_export_omits_raw_responses() {
        let completer = ScriptedCompleter::new(&["plan", "executive content", "metadata json"]);
        let engine = PromptEngine::new();
        let state = populated_state();

        let delta = run(&state, &completer, &engine).expect("run");

        let export = delta
            .documents
            .iter()
            .find(|doc| doc.doc_type == "technical_export")
            .expect("export");
        assert_eq!(export.format, DocumentFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&export.content).expect("json");
        assert!(value.get("responses").is_none());
        assert_eq!(value["query"], "study orbital debris");
    }

    #[test]
    fn main_report_sections_cover_recorded_stages() {
        let completer = ScriptedCompleter::new(&["plan", "executive content", "metadata json"]);
        let engine = PromptEngine::new();
        let state = populated_state();

        let delta = run(&state, &completer, &engine).expect("run");

        let main = delta
            .documents
            .iter()
            .find(|doc| doc.doc_type == "main_report")
            .expect("main report");
        assert!(main.content.contains("## Executive Summary"));
        assert!(main.content.contains("the synthesis"));
        assert!(main.content.contains("### Research Analysis"));
    }
}
