//! Problem input files (TOML or JSON, chosen by extension)

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::domain::ProblemInput;

/// Six sprints, twenty-one stories, OR-group and multi-AND dependencies
pub const REFERENCE_BACKLOG: &str = include_str!("../data/backlog.toml");

pub fn reference_backlog() -> Result<ProblemInput> {
    from_toml_str(REFERENCE_BACKLOG).context("built-in reference backlog is malformed")
}

pub fn from_toml_str(text: &str) -> Result<ProblemInput> {
    Ok(toml::from_str(text)?)
}

pub fn from_json_str(text: &str) -> Result<ProblemInput> {
    Ok(serde_json::from_str(text)?)
}

pub fn from_path(path: &Path) -> Result<ProblemInput> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read problem file {}", path.display()))?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => from_toml_str(&text),
        Some("json") => from_json_str(&text),
        _ => bail!(
            "unsupported problem file {} (expected .toml or .json)",
            path.display()
        ),
    };
    parsed.with_context(|| format!("failed to parse problem file {}", path.display()))
}
