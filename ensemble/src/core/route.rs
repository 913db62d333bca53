//! Routing/termination policy for the supervisor.
//!
//! Split into pure steps so every property holds without a live
//! collaborator: [`preflight`] covers the terminal short-circuits,
//! [`resolve_reply`] validates untrusted text with a deterministic fallback,
//! and [`commit`] applies the decision. The supervisor agent wires these
//! around the one completion call.

use std::collections::BTreeMap;

use crate::core::stage::{RouteDecision, Stage, parse_reply};
use crate::core::state::{RunState, StageReport};

/// Why the policy declared the run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishCause {
    /// `workflow_complete` was already set on entry.
    AlreadyComplete,
    /// The iteration ceiling was reached; completeness was not considered.
    IterationCeiling,
    /// The validated (or fallback) decision was the finish keyword.
    Declared,
}

/// Outcome of one policy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    Dispatch(Stage),
    Finished(FinishCause),
}

/// Terminal checks that precede any collaborator consultation.
///
/// Increments the iteration counter — exactly once per policy invocation,
/// terminal short-circuits included — and returns `Some` when the run must
/// end without consulting the collaborator. The ceiling compares the
/// pre-increment counter value.
pub fn preflight(state: &mut RunState) -> Option<Routing> {
    let before = state.iteration_count;
    state.iteration_count += 1;

    if state.workflow_complete {
        state.next_agent = None;
        return Some(Routing::Finished(FinishCause::AlreadyComplete));
    }
    if before >= state.max_iterations {
        state.workflow_complete = true;
        state.next_agent = None;
        return Some(Routing::Finished(FinishCause::IterationCeiling));
    }
    None
}

/// Deterministic decision used when the collaborator's reply is unusable:
/// research first, then summary, then finish.
pub fn fallback_decision(results: &BTreeMap<Stage, StageReport>) -> RouteDecision {
    if !results.contains_key(&Stage::Research) {
        RouteDecision::Continue(Stage::Research)
    } else if !results.contains_key(&Stage::Summary) {
        RouteDecision::Continue(Stage::Summary)
    } else {
        RouteDecision::Finish
    }
}

/// Validate a collaborator reply, falling back deterministically.
///
/// Returns the decision and whether the fallback was used (for logging).
pub fn resolve_reply(
    reply: &str,
    results: &BTreeMap<Stage, StageReport>,
) -> (RouteDecision, bool) {
    match parse_reply(reply) {
        Some(decision) => (decision, false),
        None => (fallback_decision(results), true),
    }
}

/// Apply a validated decision to the state and report the routing outcome.
pub fn commit(state: &mut RunState, decision: RouteDecision) -> Routing {
    match decision {
        RouteDecision::Finish => {
            state.workflow_complete = true;
            state.next_agent = None;
            Routing::Finished(FinishCause::Declared)
        }
        RouteDecision::Continue(stage) => {
            state.next_agent = Some(stage);
            Routing::Dispatch(stage)
        }
    }
}
