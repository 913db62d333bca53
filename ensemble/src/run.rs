//! Run loop: drives supervisor → stage → supervisor until termination.
//!
//! The loop owns the run state. Stages return deltas; the loop merges them,
//! writes documents when the document stage produces them, and persists the
//! run record at termination. Any stage or policy error aborts the whole run
//! and propagates to the caller.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::agents::{document, financial, medical, repair, research, summary, supervisor};
use crate::core::route::{FinishCause, Routing};
use crate::core::stage::Stage;
use crate::core::state::{RunState, StageDelta};
use crate::io::config::PipelineConfig;
use crate::io::llm::ChatCompleter;
use crate::io::prompt::PromptEngine;
use crate::io::record::write_run_record;
use crate::io::report::save_documents;

/// Why the run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    /// The document stage finished and the supervisor confirmed completion.
    Complete,
    /// The supervisor declared the run finished without a document pass.
    Declared,
    /// The iteration ceiling forced termination.
    IterationCeiling,
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunOutcome {
    pub stop: RunStop,
    /// Supervisor invocations, including the terminal one.
    pub iterations: u32,
    pub record_path: PathBuf,
    /// Where documents landed, when the document stage ran.
    pub output_dir: Option<PathBuf>,
    pub state: RunState,
}

/// Progress notifications for the caller (the CLI prints these).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Routed(Stage),
    StageCompleted { stage: Stage, message: String },
    DocumentsSaved { dir: PathBuf },
}

/// Execute one full pipeline run for `query`.
///
/// Side effects: completion calls through `completer`, documents and the run
/// record under `output_root`. On error the run aborts and no record is
/// written.
pub fn run_pipeline<F>(
    query: &str,
    config: &PipelineConfig,
    completer: &dyn ChatCompleter,
    output_root: &Path,
    mut on_event: F,
) -> Result<RunOutcome>
where
    F: FnMut(&PipelineEvent),
{
    config.validate()?;
    let engine = PromptEngine::new();
    let mut state = RunState::new(query, config.max_iterations);
    let mut output_dir = None;

    let stop = loop {
        match supervisor::decide(&mut state, completer, &engine)? {
            Routing::Finished(cause) => break stop_for(cause),
            Routing::Dispatch(stage) => {
                on_event(&PipelineEvent::Routed(stage));
                let delta = dispatch(stage, &state, completer, &engine)?;
                let message = delta.message.clone();
                let has_documents = !delta.documents.is_empty();
                state.apply(delta);

                if has_documents {
                    let saved =
                        save_documents(output_root, &state.documents, &state.query, Local::now())?;
                    state.messages.push(format!("Documents saved to {}", saved.dir.display()));
                    on_event(&PipelineEvent::DocumentsSaved { dir: saved.dir.clone() });
                    output_dir = Some(saved.dir);
                }
                on_event(&PipelineEvent::StageCompleted { stage, message });
            }
        }
    };

    let record_path = write_run_record(output_root, &state, Local::now())?;
    info!(iterations = state.iteration_count, stop = ?stop, "run finished");
    Ok(RunOutcome {
        stop,
        iterations: state.iteration_count,
        record_path,
        output_dir,
        state,
    })
}

fn dispatch(
    stage: Stage,
    state: &RunState,
    completer: &dyn ChatCompleter,
    engine: &PromptEngine,
) -> Result<StageDelta> {
    match stage {
        Stage::Research => research::run(state, completer, engine),
        Stage::Repair => repair::run(state, completer, engine),
        Stage::Medical => medical::run(state, completer, engine),
        Stage::Financial => financial::run(state, completer, engine),
        Stage::Summary => summary::run(state, completer, engine),
        Stage::Document => document::run(state, completer, engine),
    }
}

fn stop_for(cause: FinishCause) -> RunStop {
    match cause {
        FinishCause::AlreadyComplete => RunStop::Complete,
        FinishCause::Declared => RunStop::Declared,
        FinishCause::IterationCeiling => RunStop::IterationCeiling,
    }
}
