//! Prompt rendering for every completion call in the pipeline.
//!
//! Each call has a Markdown template compiled in at build time; agents own
//! their fixed system instructions and render the user content here. All
//! state reaching a template goes through an explicit snapshot struct, so
//! prompts cannot silently grow new inputs.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::analysis::QueryAnalysis;

const ROUTING_TEMPLATE: &str = include_str!("prompts/routing.md");
const ANALYZE_TEMPLATE: &str = include_str!("prompts/analyze.md");
const RESEARCH_TEMPLATE: &str = include_str!("prompts/research.md");
const MEDICAL_TEMPLATE: &str = include_str!("prompts/medical.md");
const FINANCIAL_TEMPLATE: &str = include_str!("prompts/financial.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");
const SUMMARY_TEMPLATE: &str = include_str!("prompts/summary.md");
const DOCUMENT_PLAN_TEMPLATE: &str = include_str!("prompts/document_plan.md");
const DOCUMENT_METADATA_TEMPLATE: &str = include_str!("prompts/document_metadata.md");
const EXECUTIVE_SUMMARY_TEMPLATE: &str = include_str!("prompts/executive_summary.md");

/// Run-state snapshot the supervisor shows the collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingSnapshot {
    pub query: String,
    pub completed_stages: Vec<String>,
    pub iteration: u32,
    pub analysis: Option<QueryAnalysis>,
}

/// Inputs for the repair stage's assessment request.
#[derive(Debug, Clone, Serialize)]
pub struct RepairSnapshot {
    pub query: String,
    pub completed_stages: Vec<String>,
    pub iteration: u32,
    pub response_count: usize,
}

/// One prior stage analysis fed into the synthesis prompt.
#[derive(Debug, Clone, Serialize)]
pub struct StageAnalysis {
    pub stage: String,
    pub text: String,
}

/// Inputs for the summary stage's synthesis request.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySnapshot {
    pub query: String,
    pub analyses: Vec<StageAnalysis>,
    pub stage_count: usize,
    pub complexity: String,
    pub domain: String,
}

/// Inputs for the document stage's planning and metadata requests.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    pub query: String,
    pub sections: Vec<String>,
    pub has_summary: bool,
    pub document_types: Vec<String>,
    pub total_documents: usize,
}

/// Inputs for the executive-summary request.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutiveSnapshot {
    pub query: String,
    pub sections: Vec<String>,
    pub summary_excerpt: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        let templates = [
            ("routing", ROUTING_TEMPLATE),
            ("analyze", ANALYZE_TEMPLATE),
            ("research", RESEARCH_TEMPLATE),
            ("medical", MEDICAL_TEMPLATE),
            ("financial", FINANCIAL_TEMPLATE),
            ("repair", REPAIR_TEMPLATE),
            ("summary", SUMMARY_TEMPLATE),
            ("document_plan", DOCUMENT_PLAN_TEMPLATE),
            ("document_metadata", DOCUMENT_METADATA_TEMPLATE),
            ("executive_summary", EXECUTIVE_SUMMARY_TEMPLATE),
        ];
        for (name, source) in templates {
            env.add_template(name, source)
                .expect("embedded template should be valid");
        }
        Self { env }
    }

    pub fn routing(&self, snapshot: &RoutingSnapshot) -> Result<String> {
        let rendered = self.env.get_template("routing")?.render(context! {
            query => snapshot.query,
            completed_stages => snapshot.completed_stages,
            iteration => snapshot.iteration,
            analysis => snapshot.analysis,
        })?;
        Ok(rendered)
    }

    pub fn analyze(&self, query: &str) -> Result<String> {
        let rendered = self
            .env
            .get_template("analyze")?
            .render(context! { query => query })?;
        Ok(rendered)
    }

    pub fn research(&self, query: &str, analysis: &QueryAnalysis) -> Result<String> {
        let rendered = self.env.get_template("research")?.render(context! {
            query => query,
            analysis => analysis,
        })?;
        Ok(rendered)
    }

    pub fn medical(&self, query: &str, research_context: &str) -> Result<String> {
        let rendered = self.env.get_template("medical")?.render(context! {
            query => query,
            research_context => research_context,
        })?;
        Ok(rendered)
    }

    pub fn financial(&self, query: &str, research_context: &str) -> Result<String> {
        let rendered = self.env.get_template("financial")?.render(context! {
            query => query,
            research_context => research_context,
        })?;
        Ok(rendered)
    }

    pub fn repair(&self, snapshot: &RepairSnapshot) -> Result<String> {
        let rendered = self.env.get_template("repair")?.render(context! {
            query => snapshot.query,
            completed_stages => snapshot.completed_stages,
            iteration => snapshot.iteration,
            response_count => snapshot.response_count,
        })?;
        Ok(rendered)
    }

    pub fn summary(&self, snapshot: &SummarySnapshot) -> Result<String> {
        let rendered = self.env.get_template("summary")?.render(context! {
            query => snapshot.query,
            analyses => snapshot.analyses,
            stage_count => snapshot.stage_count,
            complexity => snapshot.complexity,
            domain => snapshot.domain,
        })?;
        Ok(rendered)
    }

    pub fn document_plan(&self, snapshot: &DocumentSnapshot) -> Result<String> {
        let rendered = self.env.get_template("document_plan")?.render(context! {
            query => snapshot.query,
            sections => snapshot.sections,
            has_summary => snapshot.has_summary,
        })?;
        Ok(rendered)
    }

    pub fn document_metadata(&self, snapshot: &DocumentSnapshot) -> Result<String> {
        let rendered = self.env.get_template("document_metadata")?.render(context! {
            query => snapshot.query,
            total_documents => snapshot.total_documents,
            document_types => snapshot.document_types,
        })?;
        Ok(rendered)
    }

    pub fn executive_summary(&self, snapshot: &ExecutiveSnapshot) -> Result<String> {
        let rendered = self.env.get_template("executive_summary")?.render(context! {
            query => snapshot.query,
            sections => snapshot.sections,
            summary_excerpt => snapshot.summary_excerpt,
        })?;
        Ok(rendered)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}
