//! The supervisor and the six worker stages.
//!
//! Worker stages share one contract: read the run state, obtain analysis text
//! from the completion collaborator, and return a [`crate::core::state::StageDelta`]
//! for the run loop to merge. Only the supervisor touches routing state.

pub mod document;
pub mod financial;
pub mod medical;
pub mod repair;
pub mod research;
pub mod summary;
pub mod supervisor;
