//! Pipeline configuration: a human-editable TOML file plus environment
//! credentials.
//!
//! The TOML file carries tunables and is optional — a missing file means
//! defaults. Credentials never live in the file; the API key comes from the
//! environment and its absence is a startup error with remediation text.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Environment variable for the API key (with `OPENAI_API_KEY` fallback).
pub const API_KEY_VAR: &str = "ENSEMBLE_API_KEY";
const API_KEY_FALLBACK_VAR: &str = "OPENAI_API_KEY";
const MODEL_VAR: &str = "ENSEMBLE_MODEL";
const BASE_URL_VAR: &str = "ENSEMBLE_BASE_URL";

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Tunables for one pipeline run (TOML).
///
/// Missing fields default to the values the pipeline ships with, so an empty
/// or absent file is always valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard ceiling on supervisor invocations per run.
    pub max_iterations: u32,
    /// Sampling temperature passed to the completion API.
    pub temperature: f64,
    /// Completion token ceiling per call.
    pub max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("temperature must be within 0.0..=2.0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PipelineConfig::default()`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        let cfg = PipelineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PipelineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Resolved API credentials and endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Raised when no API key is configured. Carries remediation text so the CLI
/// can tell the user exactly what to set.
#[derive(Debug)]
pub struct MissingApiKey;

impl std::fmt::Display for MissingApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no API key configured: set {API_KEY_VAR} (or {API_KEY_FALLBACK_VAR}) in the environment"
        )
    }
}

impl std::error::Error for MissingApiKey {}

/// Read credentials from the environment.
///
/// The key is required; model and base URL fall back to OpenAI defaults so a
/// bare key is enough to run.
pub fn load_credentials() -> Result<Credentials> {
    let api_key = env::var(API_KEY_VAR)
        .or_else(|_| env::var(API_KEY_FALLBACK_VAR))
        .map_err(|_| anyhow::Error::new(MissingApiKey))?;
    if api_key.trim().is_empty() {
        return Err(anyhow::Error::new(MissingApiKey));
    }
    let model = env::var(MODEL_VAR).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let base_url = env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    Ok(Credentials {
        api_key,
        model,
        base_url,
    })
}
