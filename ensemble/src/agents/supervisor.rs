//! Supervisor: routing and termination decisions.
//!
//! Wraps the pure policy in [`crate::core::route`] around the one completion
//! call. The collaborator's reply never reaches control flow unvalidated,
//! and the collaborator is not consulted at all on the terminal paths.

use anyhow::Result;
use tracing::{debug, info};

use crate::core::route::{self, FinishCause, Routing};
use crate::core::stage::RouteDecision;
use crate::core::state::RunState;
use crate::io::llm::{ChatCompleter, CompletionRequest};
use crate::io::prompt::{PromptEngine, RoutingSnapshot};

const ROUTING_SYSTEM: &str = "\
You are the supervisor of a multi-stage analysis workflow. Decide which stage
runs next.

Available stages:
- research: research and initial analysis
- repair: quality assurance and error detection
- medical: medical/pharmaceutical specialist analysis
- financial: financial analysis
- summary: synthesis of all prior analyses
- document: final document generation

Rules:
1. Start with research if no research has been done.
2. Route to medical for medical queries and financial for financial queries.
3. Use repair for quality checks and repairs.
4. Use summary after the main analyses are in.
5. Use document last.

Answer with exactly one stage name, or 'end' when all necessary work is done.";

/// Run the routing/termination policy once.
///
/// Increments the iteration counter exactly once, short-circuits the terminal
/// paths without consulting the collaborator, and otherwise validates the
/// collaborator's reply with the deterministic fallback. A failed completion
/// call propagates as `Err`; the caller decides what a failure aborts.
pub fn decide(
    state: &mut RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<Routing> {
    let iteration = state.iteration_count;
    if let Some(routing) = route::preflight(state) {
        let note = match routing {
            Routing::Finished(FinishCause::AlreadyComplete) => "workflow already complete",
            _ => "maximum iterations reached",
        };
        info!(iteration, "supervisor: {note}");
        state.messages.push(format!("Supervisor: {note}"));
        return Ok(routing);
    }

    let snapshot = RoutingSnapshot {
        query: state.query.clone(),
        completed_stages: state.completed_stages().iter().map(|s| s.to_string()).collect(),
        iteration,
        analysis: state.query_analysis.clone(),
    };
    let request = CompletionRequest {
        system: ROUTING_SYSTEM.to_string(),
        user: engine.routing(&snapshot)?,
    };
    let reply = completer.complete(&request)?;

    let (decision, fell_back) = route::resolve_reply(&reply, &state.results);
    if fell_back {
        debug!(rejected = %reply.trim(), "routing reply outside vocabulary, using fallback");
    }
    let routing = route::commit(state, decision);

    let label = match decision {
        RouteDecision::Continue(stage) => stage.as_str(),
        RouteDecision::Finish => "end",
    };
    info!(iteration, decision = label, fallback = fell_back, "supervisor: routing decision");
    state.messages.push(format!("Supervisor: routing decision - {label}"));
    Ok(routing)
}
