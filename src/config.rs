use crate::connectors::slack::SlackConfig;
use crate::core::fanout::FanOutConfig;
use crate::core::workflow::WorkflowConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0} must be greater than 0")]
    InvalidConcurrency(&'static str),
}

/// Everything a [`RequestDispatcher`](crate::dispatch::RequestDispatcher) needs at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardhubConfig {
    pub fan_out: FanOutConfig,
    pub workflow: WorkflowConfig,
    pub slack: SlackConfig,
}

impl CardhubConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CardhubConfig = serde_json::from_str(json)?;
        if config.fan_out.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency("fan_out.max_concurrency"));
        }
        if config.workflow.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency("workflow.max_concurrency"));
        }
        Ok(config)
    }

    pub fn with_slack(mut self, slack: SlackConfig) -> Self {
        self.slack = slack;
        self
    }
}
