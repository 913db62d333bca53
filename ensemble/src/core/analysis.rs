//! Query classification produced by the research stage.
//!
//! The collaborator is asked for a JSON object describing the query. The
//! payload is untrusted: it is extracted from whatever text came back,
//! validated against an embedded JSON Schema, and only then deserialized.
//! Any failure along the way substitutes a deterministic default
//! classification instead of surfacing an error.

use std::sync::LazyLock;

use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::stage::Stage;

const ANALYSIS_SCHEMA: &str = include_str!("../../schemas/query_analysis.schema.json");

/// Advisory classification of the user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Main purpose of the query (research, analysis, question, ...).
    pub intent: String,
    /// Subject area (medical, financial, technical, general, ...).
    pub domain: String,
    pub complexity: Complexity,
    pub keywords: Vec<String>,
    /// Stage names the classifier thinks should handle the query. Advisory
    /// only; kept as free text because the classifier is not bound to the
    /// routing vocabulary.
    pub suggested_agents: Vec<String>,
    /// Rough time estimate in minutes, as reported (e.g. "5-10").
    pub estimated_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl QueryAnalysis {
    /// Whether the classified domain names one of the specialist stages.
    pub fn specialist_hint(&self) -> Option<Stage> {
        let domain = self.domain.to_lowercase();
        if domain.contains("medical") || domain.contains("pharma") {
            Some(Stage::Medical)
        } else if domain.contains("financ") {
            Some(Stage::Financial)
        } else {
            None
        }
    }
}

/// Deterministic classification used when the collaborator's payload is
/// unusable.
pub fn fallback_analysis(query: &str) -> QueryAnalysis {
    QueryAnalysis {
        intent: "general_inquiry".to_string(),
        domain: "general".to_string(),
        complexity: Complexity::Medium,
        keywords: query.split_whitespace().map(str::to_string).collect(),
        suggested_agents: vec!["research".to_string(), "summary".to_string()],
        estimated_time: "5-10".to_string(),
    }
}

/// Parse a collaborator reply into a classification.
///
/// Extracts the first JSON object from the reply (models wrap payloads in
/// code fences or prose), validates it against the embedded schema, then
/// deserializes. Every failure path returns [`fallback_analysis`].
pub fn parse_analysis(reply: &str, query: &str) -> QueryAnalysis {
    let Some(value) = extract_json_object(reply) else {
        debug!("analysis reply contained no JSON object, using fallback");
        return fallback_analysis(query);
    };
    if let Err(err) = validate_analysis(&value) {
        debug!(%err, "analysis payload failed schema validation, using fallback");
        return fallback_analysis(query);
    }
    match serde_json::from_value(value) {
        Ok(analysis) => analysis,
        Err(err) => {
            debug!(%err, "analysis payload failed deserialization, using fallback");
            fallback_analysis(query)
        }
    }
}

/// Validate a candidate payload against the classification schema
/// (Draft 2020-12).
fn validate_analysis(instance: &Value) -> Result<(), String> {
    static SCHEMA: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
        let schema: Value =
            serde_json::from_str(ANALYSIS_SCHEMA).expect("embedded schema should be valid JSON");
        jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .expect("embedded schema should compile")
    });
    let messages: Vec<String> = SCHEMA.iter_errors(instance).map(|err| err.to_string()).collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(messages.join("; "))
    }
}

/// Locate and parse the first balanced JSON object in free text.
///
/// Fences and prose around the object are skipped; candidates are attempted
/// from each `{` until one parses. Trailing text after the object is ignored.
fn extract_json_object(raw: &str) -> Option<Value> {
    for (idx, ch) in raw.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&raw[idx..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next()
            && value.is_object()
        {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "intent": "research",
        "domain": "medical",
        "complexity": "high",
        "keywords": ["diagnostics", "ai"],
        "suggested_agents": ["research", "medical"],
        "estimated_time": "10-15"
    }"#;

    #[test]
    fn parses_a_valid_payload() {
        let analysis = parse_analysis(VALID, "query");
        assert_eq!(analysis.domain, "medical");
        assert_eq!(analysis.complexity, Complexity::High);
        assert_eq!(analysis.specialist_hint(), Some(Stage::Medical));
    }

    #[test]
    fn parses_a_payload_wrapped_in_fences_and_prose() {
        let reply = format!("Here is the classification:\n```json\n{VALID}\n```\nDone.");
        let analysis = parse_analysis(&reply, "query");
        assert_eq!(analysis.intent, "research");
    }

    #[test]
    fn malformed_json_falls_back() {
        let analysis = parse_analysis("not json at all", "analyze drug trials");
        assert_eq!(analysis, fallback_analysis("analyze drug trials"));
        assert_eq!(
            analysis.keywords,
            vec!["analyze".to_string(), "drug".to_string(), "trials".to_string()]
        );
    }

    /// A parseable object that violates the schema (unknown complexity) is
    /// rejected, not partially accepted.
    #[test]
    fn schema_violation_falls_back() {
        let reply = r#"{"intent": "x", "domain": "y", "complexity": "extreme",
                        "keywords": [], "suggested_agents": [], "estimated_time": "1"}"#;
        assert_eq!(parse_analysis(reply, "q"), fallback_analysis("q"));
    }

    #[test]
    fn missing_fields_fall_back() {
        let reply = r#"{"intent": "research"}"#;
        assert_eq!(parse_analysis(reply, "q"), fallback_analysis("q"));
    }

    #[test]
    fn financial_domain_hints_financial_stage() {
        let analysis = QueryAnalysis {
            domain: "finance".to_string(),
            ..fallback_analysis("q")
        };
        assert_eq!(analysis.specialist_hint(), Some(Stage::Financial));
    }
}
