//! Layered configuration loading using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`ISSUE_LABELER_*` prefix, `__` as separator)
//! 2. The file given with `--config`, or `.issue-labeler/config.toml`
//! 3. Built-in defaults
//!
//! Figment maps `ISSUE_LABELER_GITHUB__TOKEN` -> `github.token`,
//! `ISSUE_LABELER_LABELER__THRESHOLD` -> `labeler.threshold`, etc.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use github::{GithubSettings, TokenClientFactory, DEFAULT_API_URL};
use triage::{ColumnId, IssueNumber, LabelerSettings, ProjectId};

pub const DEFAULT_CONFIG_PATH: &str = ".issue-labeler/config.toml";
const ENV_PREFIX: &str = "ISSUE_LABELER_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("`{0}` must be set for board commands")]
    Missing(&'static str),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    /// Token for issue and pull request calls.
    pub token: String,
    /// Token for project board calls; falls back to `token`.
    pub user_token: String,
    /// Environment variable re-read whenever a client is recreated.
    pub token_env: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            token: String::new(),
            user_token: String::new(),
            token_env: Some("GITHUB_TOKEN".into()),
            user_agent: concat!("issue-labeler/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: 30,
        }
    }
}

impl GithubConfig {
    /// Client factory for issue and pull request calls.
    ///
    /// An explicit `token` is used as is. Without one the token is read from
    /// `token_env` each time a client is created, so rotations are picked up.
    pub fn app_factory(&self) -> TokenClientFactory {
        let factory = TokenClientFactory::new(self.settings_with(self.token.clone()));
        match &self.token_env {
            Some(var) if self.token.is_empty() => factory.with_token_env(var.clone()),
            _ => factory,
        }
    }

    /// Client factory for project board calls; falls back to
    /// [`GithubConfig::app_factory`] when no `user_token` is set.
    pub fn user_factory(&self) -> TokenClientFactory {
        if self.user_token.is_empty() {
            self.app_factory()
        } else {
            TokenClientFactory::new(self.settings_with(self.user_token.clone()))
        }
    }

    fn settings_with(&self, token: String) -> GithubSettings {
        GithubSettings {
            api_url: self.api_url.clone(),
            token,
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    pub predictor_url: String,
    pub predictor_timeout_secs: u64,
    pub threshold: f64,
    pub max_suggestions: usize,
    /// Add the best label to the issue after predicting.
    pub apply_labels: bool,
    pub area_prefix: String,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        let defaults = LabelerSettings::default();
        Self {
            predictor_url: "http://localhost:8080/predict".into(),
            predictor_timeout_secs: 30,
            threshold: defaults.threshold,
            max_suggestions: defaults.max_suggestions,
            apply_labels: false,
            area_prefix: defaults.area_prefix,
        }
    }
}

impl LabelerConfig {
    pub fn settings(&self) -> LabelerSettings {
        LabelerSettings {
            threshold: self.threshold,
            max_suggestions: self.max_suggestions,
            area_prefix: self.area_prefix.clone(),
        }
    }
}

/// Board routines that `board run` may execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Routine {
    AddUntriaged,
    MoveMilestone,
    AddPrs,
    AddMilestone,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub untriaged: Option<u64>,
    pub active_prs: Option<u64>,
    pub future: Option<u64>,
    pub uncommitted: Option<u64>,
}

/// Cards for issues with `milestone` belong in `column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRule {
    pub milestone: String,
    pub column: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub project_id: Option<u64>,
    /// Ordered allow-list of area labels.
    pub area_labels: Vec<String>,
    /// Label marking issues that still need triage.
    pub untriaged_label: String,
    /// Issues carrying any of these are not yet triaged.
    pub triage_labels: Vec<String>,
    /// Milestone whose cards `move-milestone` moves from `uncommitted` to `future`.
    pub move_milestone: String,
    /// Issues `move-milestone` never moves.
    pub skip_issues: Vec<u64>,
    pub columns: ColumnsConfig,
    pub milestone_rules: Vec<MilestoneRule>,
    pub enabled: Vec<Routine>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            area_labels: Vec::new(),
            untriaged_label: "needs further triage".into(),
            triage_labels: vec!["untriaged".into(), "needs further triage".into()],
            move_milestone: "Future".into(),
            skip_issues: Vec::new(),
            columns: ColumnsConfig::default(),
            milestone_rules: Vec::new(),
            enabled: vec![Routine::AddPrs],
        }
    }
}

impl BoardConfig {
    pub fn project(&self) -> Result<ProjectId, ConfigError> {
        self.project_id
            .map(ProjectId::new)
            .ok_or(ConfigError::Missing("board.project_id"))
    }

    pub fn area_labels(&self) -> Result<Vec<String>, ConfigError> {
        if self.area_labels.is_empty() {
            Err(ConfigError::Missing("board.area_labels"))
        } else {
            Ok(self.area_labels.clone())
        }
    }

    pub fn column(&self, name: &'static str, value: Option<u64>) -> Result<ColumnId, ConfigError> {
        value.map(ColumnId::new).ok_or(ConfigError::Missing(name))
    }

    pub fn skip_set(&self) -> std::collections::HashSet<IssueNumber> {
        self.skip_issues.iter().copied().map(IssueNumber::new).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
    /// Default filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// OTLP gRPC endpoint; traces are exported only when set.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json: false,
            log_filter: "info".into(),
            otlp_endpoint: None,
            service_name: "issue-labeler".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub labeler: LabelerConfig,
    pub board: BoardConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Loads and validates configuration from all sources.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
        }
        let config: Config = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.labeler.threshold;
        if !(threshold.is_finite() && (0.0..=1.0).contains(&threshold)) {
            return Err(ConfigError::Invalid {
                field: "labeler.threshold",
                message: format!("{threshold} is outside [0, 1]"),
            });
        }
        if self.labeler.max_suggestions == 0 {
            return Err(ConfigError::Invalid {
                field: "labeler.max_suggestions",
                message: "must be at least 1".into(),
            });
        }
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "github.api_url",
                message: "must not be empty".into(),
            });
        }
        if let Some(rule) = self
            .board
            .milestone_rules
            .iter()
            .find(|r| r.milestone.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "board.milestone_rules",
                message: format!("rule for column {} has an empty milestone", rule.column),
            });
        }
        Ok(())
    }
}
