//! Side-effecting operations: configuration, the completion API, prompt
//! rendering, interactive input, and files written per run.

pub mod config;
pub mod input;
pub mod llm;
pub mod prompt;
pub mod record;
pub mod report;
