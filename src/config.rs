use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::planner::DEFAULT_OBJECTIVE_TOLERANCE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub problem: ProblemConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget per solve; unset or 0 means no limit
    pub time_limit_seconds: Option<u64>,
    /// Relative tolerance for the objective cross-check
    pub objective_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: None,
            objective_tolerance: DEFAULT_OBJECTIVE_TOLERANCE,
        }
    }
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemConfig {
    /// TOML or JSON problem file; the reference backlog is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("SPRINT_PLANNER__").split("__")),
        )
    }

    /// Extract on top of built-in defaults
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(figment);
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let cfg = Config::from_figment(Figment::new()).unwrap();
        assert_eq!(cfg.solver.time_limit(), None);
        assert_eq!(cfg.solver.objective_tolerance, DEFAULT_OBJECTIVE_TOLERANCE);
        assert!(cfg.problem.path.is_none());
        assert_eq!(cfg.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_toml_overrides() {
        let toml = r#"
            [solver]
            time_limit_seconds = 45

            [problem]
            path = "data/backlog.json"

            [output]
            format = "json"
        "#;
        let cfg = Config::from_figment(Figment::new().merge(Toml::string(toml))).unwrap();
        assert_eq!(cfg.solver.time_limit(), Some(Duration::from_secs(45)));
        assert_eq!(cfg.problem.path, Some(PathBuf::from("data/backlog.json")));
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert_eq!(cfg.solver.objective_tolerance, DEFAULT_OBJECTIVE_TOLERANCE);
    }

    #[test]
    fn test_zero_time_limit_means_unlimited() {
        let cfg = Config::from_figment(
            Figment::new().merge(Toml::string("[solver]\ntime_limit_seconds = 0")),
        )
        .unwrap();
        assert_eq!(cfg.solver.time_limit(), None);
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let result =
            Config::from_figment(Figment::new().merge(Toml::string("[output]\nformat = \"xml\"")));
        assert!(result.is_err());
    }
}
