//! Bot configuration loaded from TOML.

use crate::core::State;
use crate::engine::RunOptions;
use crate::enforcement::{EnforcementBuilder, EnforcementRules, ViolationStrategy};
use crate::trading::{ExitSignal, StrategyParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Top-level configuration for one trade bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub agent_id: String,
    pub strategy: StrategyParams,
    /// Fail the first closing order once, exercising rollback-retry.
    pub simulate_order_fill_failure: bool,
    pub retry: RetryConfig,
    pub run: RunConfig,
    pub simulation: SimulationConfig,
    /// Directory for JSON checkpoints; in-memory only when unset.
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            agent_id: "trade-bot".to_string(),
            strategy: StrategyParams::default(),
            simulate_order_fill_failure: true,
            retry: RetryConfig::default(),
            run: RunConfig::default(),
            simulation: SimulationConfig::default(),
            checkpoint_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub window_secs: Option<u64>,
    pub on_violation: ViolationStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            window_secs: None,
            on_violation: ViolationStrategy::Abort,
        }
    }
}

impl RetryConfig {
    pub fn enforcement_rules<S: State>(&self) -> EnforcementRules<S> {
        let builder = EnforcementBuilder::new()
            .max_attempts(self.max_attempts)
            .on_violation(self.on_violation);
        let builder = match self.window_secs {
            Some(secs) => builder.retry_window(Duration::from_secs(secs)),
            None => builder,
        };
        builder.build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_iterations: Option<usize>,
    pub deadline_secs: Option<u64>,
    pub idle_backoff_ms: u64,
    pub action_deadline_ms: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            deadline_secs: None,
            idle_backoff_ms: 100,
            action_deadline_ms: None,
        }
    }
}

impl RunConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_iterations: self.max_iterations,
            deadline: self.deadline_secs.map(Duration::from_secs),
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
        }
    }

    pub fn action_deadline(&self) -> Option<Duration> {
        self.action_deadline_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub work_delay_ms: u64,
    /// Scripted exit signals; random exits when empty.
    pub exits: Vec<ExitSignal>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            work_delay_ms: 1000,
            exits: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent_id must not be empty".into(),
            ));
        }

        if !(self.strategy.target_delta > 0.0 && self.strategy.target_delta <= 1.0) {
            return Err(ConfigError::ValidationError(
                "strategy.target_delta must be in (0, 1]".into(),
            ));
        }

        if self.strategy.target_dte == 0 {
            return Err(ConfigError::ValidationError(
                "strategy.target_dte must be at least 1".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        // ignore_and_log never refuses a retry, so the run itself must be bounded.
        if self.retry.on_violation == ViolationStrategy::IgnoreAndLog
            && self.run.max_iterations.is_none()
            && self.run.deadline_secs.is_none()
        {
            return Err(ConfigError::ValidationError(
                "retry.on_violation = \"ignore_and_log\" requires run.max_iterations or run.deadline_secs".into(),
            ));
        }

        Ok(())
    }
}
