//! Runner configuration.
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! ```toml
//! [model]
//! id = "gemini-2.0-flash"
//! provider = "google"
//! api_key_env = "GOOGLE_API_KEY"
//!
//! [runner]
//! app_id = "weather_tutorial_app"
//! max_turns_safeguard = 50
//! tool_timeout = "30s"
//! tool_retry_budget = 2
//! max_tool_rounds = 8
//!
//! [agents.greeting_agent]
//! instruction = "You are the Greeting Agent."
//! description = "Handles simple greetings and hellos"
//! ```
//!
//! `PARLEY_MODEL`, `PARLEY_PROVIDER` and `PARLEY_API_KEY_ENV` override the
//! `[model]` table. The key itself is read from the variable `api_key_env`
//! names; the `offline` provider needs none.

use parley_core::AgentId;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::{Agent, TurnLimits};
use crate::coordinator::DEFAULT_MAX_TURNS_SAFEGUARD;
use crate::error::ConfigError;
use crate::secret::SecretString;

/// Provider that runs without a remote service.
pub const OFFLINE_PROVIDER: &str = "offline";

pub const ENV_MODEL: &str = "PARLEY_MODEL";
pub const ENV_PROVIDER: &str = "PARLEY_PROVIDER";
pub const ENV_API_KEY_ENV: &str = "PARLEY_API_KEY_ENV";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParleyConfig {
    pub model: ModelConfig,
    pub runner: RunnerConfig,
    pub agents: BTreeMap<String, AgentConfig>,
    #[serde(skip)]
    api_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub id: Option<String>,
    pub provider: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: None,
            provider: OFFLINE_PROVIDER.to_string(),
            api_key_env: None,
        }
    }
}

impl ModelConfig {
    pub fn is_offline(&self) -> bool {
        self.provider == OFFLINE_PROVIDER
    }

    /// Variable the key is read from: the configured one, or
    /// `<PROVIDER>_API_KEY`.
    pub fn key_variable(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| format!("{}_API_KEY", self.provider.to_uppercase()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub app_id: String,
    pub max_turns_safeguard: Option<usize>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub tool_timeout: Duration,
    pub tool_retry_budget: usize,
    pub max_tool_rounds: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let limits = TurnLimits::default();
        Self {
            app_id: "parley".to_string(),
            max_turns_safeguard: Some(DEFAULT_MAX_TURNS_SAFEGUARD),
            tool_timeout: parley_tools::DEFAULT_TOOL_TIMEOUT,
            tool_retry_budget: limits.tool_retry_budget,
            max_tool_rounds: limits.max_tool_rounds,
        }
    }
}

impl RunnerConfig {
    pub fn turn_limits(&self) -> TurnLimits {
        TurnLimits {
            tool_retry_budget: self.tool_retry_budget,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

/// Per-agent overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub instruction: Option<String>,
    pub description: Option<String>,
}

impl ParleyConfig {
    /// A ready-to-use offline configuration.
    pub fn offline(model_id: impl Into<String>) -> Self {
        Self {
            model: ModelConfig {
                id: Some(model_id.into()),
                ..ModelConfig::default()
            },
            ..Self::default()
        }
    }

    /// Read a TOML file, apply environment overrides and resolve credentials.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut config = Self::load_from_toml(&content)?;
        config.apply_env(|name| std::env::var(name).ok());
        debug!(path = %path.display(), provider = %config.model.provider, "Loaded configuration");
        Ok(config)
    }

    /// Parse TOML only; no environment lookups.
    pub fn load_from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Apply `PARLEY_*` overrides and read the API key through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.model.id = Some(model);
        }
        if let Some(provider) = lookup(ENV_PROVIDER).filter(|v| !v.is_empty()) {
            self.model.provider = provider;
        }
        if let Some(var) = lookup(ENV_API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.model.api_key_env = Some(var);
        }

        if !self.model.is_offline() {
            self.api_key = lookup(&self.model.key_variable())
                .filter(|v| !v.is_empty())
                .map(SecretString::new);
            if self.api_key.is_none() {
                warn!(
                    provider = %self.model.provider,
                    variable = %self.model.key_variable(),
                    "No API key found in environment"
                );
            }
        }
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    /// Check everything a runner needs before the first turn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.model.id {
            Some(id) if !id.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingModel),
        }

        if !self.model.is_offline() && self.api_key.is_none() {
            return Err(ConfigError::MissingCredentials {
                provider: self.model.provider.clone(),
                env_var: self.model.key_variable(),
            });
        }

        if self.runner.tool_timeout.is_zero() {
            return Err(ConfigError::invalid("runner.tool_timeout", "must be greater than zero"));
        }

        if self.runner.max_turns_safeguard == Some(0) {
            return Err(ConfigError::invalid(
                "runner.max_turns_safeguard",
                "must be greater than zero",
            ));
        }

        if self.runner.max_tool_rounds == 0 {
            return Err(ConfigError::invalid("runner.max_tool_rounds", "must be greater than zero"));
        }

        parley_core::AppId::parse(&self.runner.app_id)
            .map_err(|e| ConfigError::invalid("runner.app_id", e.to_string()))?;

        for name in self.agents.keys() {
            AgentId::parse(name)
                .map_err(|e| ConfigError::invalid(format!("agents.{name}"), e.to_string()))?;
        }

        Ok(())
    }

    /// Tool registry honouring `runner.tool_timeout`.
    pub fn tool_registry(&self) -> parley_tools::InMemoryToolRegistry {
        parley_tools::InMemoryToolRegistry::new().with_timeout(self.runner.tool_timeout)
    }

    pub fn agent(&self, id: &AgentId) -> Option<&AgentConfig> {
        self.agents.get(id.as_str())
    }

    /// Apply any `[agents.<id>]` overrides to `agent`.
    pub fn configure(&self, agent: Agent) -> Agent {
        let Some(overrides) = self.agent(agent.id()) else {
            return agent;
        };
        let mut agent = agent;
        if let Some(instruction) = &overrides.instruction {
            agent = agent.with_instruction(instruction.clone());
        }
        if let Some(description) = &overrides.description {
            agent = agent.with_description(description.clone());
        }
        agent
    }
}
