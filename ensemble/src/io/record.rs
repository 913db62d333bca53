//! Persisted run record written when a run terminates.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::debug;

use crate::core::state::RunState;

/// Serialize the full run state to `ensemble_run_<timestamp>.json` under
/// `dir`, atomically (temp file + rename). Returns the record path.
///
/// The record has the same shape as the run state; no further schema is
/// imposed on it.
pub fn write_run_record(
    dir: &Path,
    state: &RunState,
    finished_at: DateTime<Local>,
) -> Result<PathBuf> {
    let stamp = finished_at.format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("ensemble_run_{stamp}.json"));
    debug!(path = %path.display(), iterations = state.iteration_count, "writing run record");

    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let mut payload = serde_json::to_string_pretty(state).context("serialize run record")?;
    payload.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)
        .with_context(|| format!("write temp run record {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("replace run record {}", path.display()))?;
    Ok(path)
}
