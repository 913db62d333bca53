//! Run state shared across the pipeline, and the deltas stages return.
//!
//! The state is owned by the run loop. Worker stages never mutate it: each
//! returns a [`StageDelta`] that the loop merges via [`RunState::apply`], so
//! every write to shared state happens in one place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::analysis::QueryAnalysis;
use crate::core::quality::RepairVerdict;
use crate::core::stage::Stage;

/// Shared record threaded through every stage of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Original user request. Set once, immutable thereafter.
    pub query: String,
    /// Advisory classification produced by the research stage.
    pub query_analysis: Option<QueryAnalysis>,
    /// Structured output per completed stage.
    pub results: BTreeMap<Stage, StageReport>,
    /// Raw completion text per completed stage.
    pub responses: BTreeMap<Stage, String>,
    /// Reported confidence per stage, where the stage reports one.
    pub confidence_scores: BTreeMap<Stage, f64>,
    /// Comprehensive synthesis, empty until the summary stage runs.
    pub summary: String,
    /// Documents generated by the document stage.
    pub documents: Vec<Document>,
    /// Append-only human-readable activity log.
    pub messages: Vec<String>,
    /// Decision slot the supervisor writes; `None` is the terminal sentinel.
    pub next_agent: Option<Stage>,
    /// Once true, the supervisor performs no further routing.
    pub workflow_complete: bool,
    /// Incremented exactly once per supervisor invocation.
    pub iteration_count: u32,
    /// Hard ceiling on supervisor invocations.
    pub max_iterations: u32,
}

impl RunState {
    pub fn new(query: impl Into<String>, max_iterations: u32) -> Self {
        let query = query.into();
        let messages = vec![format!("System initialized with query: {query}")];
        Self {
            query,
            query_analysis: None,
            results: BTreeMap::new(),
            responses: BTreeMap::new(),
            confidence_scores: BTreeMap::new(),
            summary: String::new(),
            documents: Vec::new(),
            messages,
            next_agent: None,
            workflow_complete: false,
            iteration_count: 0,
            max_iterations,
        }
    }

    /// Stage names already present in `results`, in stable order.
    pub fn completed_stages(&self) -> Vec<&'static str> {
        self.results.keys().map(|stage| stage.as_str()).collect()
    }

    /// Merge a worker stage's delta. The only mutation path for stage output.
    pub fn apply(&mut self, delta: StageDelta) {
        if let Some(analysis) = delta.analysis
            && self.query_analysis.is_none()
        {
            self.query_analysis = Some(analysis);
        }
        if let Some(confidence) = delta.report.confidence() {
            self.confidence_scores.insert(delta.stage, confidence);
        }
        self.results.insert(delta.stage, delta.report);
        self.responses.insert(delta.stage, delta.response);
        self.messages.push(delta.message);
        if let Some(summary) = delta.summary {
            self.summary = summary;
        }
        self.documents.extend(delta.documents);
        if delta.completes_run {
            self.workflow_complete = true;
            self.next_agent = None;
        }
    }
}

/// Typed unit of change a worker stage hands back to the run loop.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDelta {
    pub stage: Stage,
    pub report: StageReport,
    /// Raw completion text the stage obtained.
    pub response: String,
    /// One activity-log line describing what the stage did.
    pub message: String,
    /// Classification, set by the research stage when none exists yet.
    pub analysis: Option<QueryAnalysis>,
    /// Comprehensive synthesis, set by the summary stage.
    pub summary: Option<String>,
    /// Generated documents, set by the document stage.
    pub documents: Vec<Document>,
    /// Set by the document stage: the run ends without further routing.
    pub completes_run: bool,
}

impl StageDelta {
    /// Delta carrying only a report, response, and log line.
    pub fn new(stage: Stage, report: StageReport, response: String, message: String) -> Self {
        Self {
            stage,
            report,
            response,
            message,
            analysis: None,
            summary: None,
            documents: Vec::new(),
            completes_run: false,
        }
    }
}

/// Structured per-stage output stored under `results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageReport {
    Research(ResearchReport),
    Specialist(SpecialistReport),
    Repair(RepairReport),
    Summary(SummaryReport),
    Documents(DocumentReport),
}

impl StageReport {
    /// Reported confidence, for stages that declare one.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            StageReport::Specialist(report) => Some(report.confidence),
            StageReport::Research(report) => Some(report.confidence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub findings: Vec<String>,
    pub confidence: f64,
    /// Follow-up stage names suggested by the classification. Advisory.
    pub recommended_followups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistReport {
    /// Domain label, e.g. "medical/pharmaceutical".
    pub domain: String,
    pub key_insights: Vec<String>,
    pub confidence: f64,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub issues_found: usize,
    pub quality_issues: Vec<String>,
    pub repair_actions: Vec<String>,
    pub status: RepairVerdict,
    pub overall_assessment: String,
    /// 1..=10, derived from the issue count.
    pub quality_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub synthesis_complete: bool,
    pub stages_synthesized: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub total_documents: usize,
    pub document_types: Vec<String>,
    /// Collection metadata text obtained from the collaborator.
    pub metadata: String,
}

/// One generated document, prior to being written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable type slug, e.g. "executive_summary"; used in file names.
    pub doc_type: String,
    pub title: String,
    pub content: String,
    pub format: DocumentFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Json,
    Text,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "md",
            DocumentFormat::Json => "json",
            DocumentFormat::Text => "txt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn research_delta() -> StageDelta {
        StageDelta::new(
            Stage::Research,
            StageReport::Research(ResearchReport {
                findings: vec!["finding".to_string()],
                confidence: 0.9,
                recommended_followups: Vec::new(),
            }),
            "analysis text".to_string(),
            "Research stage completed".to_string(),
        )
    }

    #[test]
    fn apply_records_report_response_and_message() {
        let mut state = RunState::new("q", 15);
        state.apply(research_delta());

        assert!(state.results.contains_key(&Stage::Research));
        assert_eq!(state.responses[&Stage::Research], "analysis text");
        assert_eq!(state.confidence_scores[&Stage::Research], 0.9);
        assert_eq!(state.messages.last().map(String::as_str), Some("Research stage completed"));
        assert_eq!(state.completed_stages(), vec!["research"]);
    }

    #[test]
    fn apply_keeps_existing_analysis() {
        let mut state = RunState::new("q", 15);
        let first = crate::core::analysis::fallback_analysis("first");
        state.query_analysis = Some(first.clone());

        let mut delta = research_delta();
        delta.analysis = Some(crate::core::analysis::fallback_analysis("second"));
        state.apply(delta);

        assert_eq!(state.query_analysis, Some(first));
    }

    /// Once a delta completes the run, the terminal sentinel invariant holds:
    /// `workflow_complete` implies `next_agent == None`.
    #[test]
    fn completing_delta_clears_next_agent() {
        let mut state = RunState::new("q", 15);
        state.next_agent = Some(Stage::Document);

        let mut delta = research_delta();
        delta.completes_run = true;
        state.apply(delta);

        assert!(state.workflow_complete);
        assert_eq!(state.next_agent, None);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = RunState::new("round trip", 15);
        state.apply(research_delta());
        let json = serde_json::to_string(&state).expect("serialize");
        let back: RunState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, state);
    }
}
