//! Stage vocabulary and routing-decision parsing.
//!
//! The supervisor's collaborator answers with free text; everything that
//! crosses from that text into control flow must pass through the closed
//! vocabulary defined here. `next_agent` is typed `Option<Stage>`, so an
//! out-of-vocabulary value is unrepresentable downstream.

use serde::{Deserialize, Serialize};

/// The keyword the collaborator answers when no further work is needed.
pub const FINISH_KEYWORD: &str = "end";

/// Worker stages the supervisor can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Research,
    Repair,
    Medical,
    Financial,
    Summary,
    Document,
}

impl Stage {
    /// All stages, in the order the pipeline documentation lists them.
    pub const ALL: [Stage; 6] = [
        Stage::Research,
        Stage::Repair,
        Stage::Medical,
        Stage::Financial,
        Stage::Summary,
        Stage::Document,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Repair => "repair",
            Stage::Medical => "medical",
            Stage::Financial => "financial",
            Stage::Summary => "summary",
            Stage::Document => "document",
        }
    }

    /// Parse an already-normalized token. Returns `None` outside the vocabulary.
    pub fn parse(token: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.as_str() == token)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated routing decision: one stage, or no more work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Continue(Stage),
    Finish,
}

/// Parse an untrusted collaborator reply into a decision.
///
/// Normalizes by trimming whitespace and lowercasing, then requires an exact
/// match against the stage vocabulary or [`FINISH_KEYWORD`]. Returns `None`
/// for anything else; callers fall back deterministically.
pub fn parse_reply(reply: &str) -> Option<RouteDecision> {
    let token = reply.trim().to_lowercase();
    if token == FINISH_KEYWORD {
        return Some(RouteDecision::Finish);
    }
    Stage::parse(&token).map(RouteDecision::Continue)
}
