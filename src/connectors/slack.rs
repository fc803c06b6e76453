//! Channel creation workflow against the Slack Web API.

use crate::core::card::HttpMethod;
use crate::core::document::UpstreamDocument;
use crate::core::workflow::{ParticipantHandle, ResourceHandle, ResourceWorkflow};
use crate::upstream::{
    Credentials, MutateOutcome, Payload, Status, UpstreamClient, UpstreamError, with_query,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub type ChannelHandle = ResourceHandle;
pub type UserHandle = ParticipantHandle;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Slack workspace URL (default: https://slack.com)
    pub base_url: String,
    /// OAuth token sent as a bearer credential
    pub token: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            base_url: "https://slack.com".to_string(),
            token: String::new(),
        }
    }
}

impl SlackConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

pub struct SlackWorkflow {
    client: Arc<dyn UpstreamClient>,
    base_url: String,
    credentials: Credentials,
}

impl SlackWorkflow {
    pub fn new(client: Arc<dyn UpstreamClient>, config: SlackConfig) -> Self {
        SlackWorkflow {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: Credentials::bearer(&config.token),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/api/{}", self.base_url, method)
    }

    /// Slack answers most failures with 200 and `"ok": false`.
    fn ensure_ok(document: &UpstreamDocument) -> Result<(), UpstreamError> {
        match document.find_string("$.ok")?.as_deref() {
            Some("false") => {
                let reason = document
                    .find_string("$.error")?
                    .unwrap_or_else(|| "unknown_error".to_string());
                Err(UpstreamError::Rejected(reason))
            }
            _ => Ok(()),
        }
    }

    async fn post(&self, method: &str, payload: Payload) -> Result<MutateOutcome, UpstreamError> {
        let outcome = self
            .client
            .mutate(HttpMethod::Post, &self.endpoint(method), payload, &self.credentials)
            .await?;
        if let Some(body) = &outcome.body {
            Self::ensure_ok(body)?;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl ResourceWorkflow for SlackWorkflow {
    async fn create(&self, name: &str) -> Result<ChannelHandle, UpstreamError> {
        let outcome = self
            .post("channels.create", Payload::form([("name", name)]))
            .await?;
        let body = outcome.body.unwrap_or_default();
        let id = body.get_string("$.channel.id")?;
        log::debug!("Created channel {} ({})", name, id);
        Ok(ResourceHandle(id))
    }

    async fn resolve(&self, email: &str) -> Result<UserHandle, UpstreamError> {
        let url = with_query(&self.endpoint("users.lookupByEmail"), [("email", email)]);
        let body = self.client.fetch(&url, &self.credentials).await?;
        Self::ensure_ok(&body)?;
        let id = body.get_string("$.user.id")?;
        log::debug!("Resolved Slack user {}", id);
        Ok(ParticipantHandle(id))
    }

    async fn attach(
        &self,
        channel: &ChannelHandle,
        users: &[UserHandle],
    ) -> Result<Status, UpstreamError> {
        let ids: Vec<&str> = users.iter().map(|u| u.0.as_str()).collect();
        let ids = ids.join(",");
        let outcome = self
            .post(
                "channels.invite",
                Payload::form([("channel", channel.0.as_str()), ("users", ids.as_str())]),
            )
            .await?;
        Ok(outcome.status)
    }

    async fn finalize(&self, channel: &ChannelHandle, message: &str) -> Result<Status, UpstreamError> {
        let outcome = self
            .post(
                "chat.postMessage",
                Payload::form([("channel", channel.0.as_str()), ("text", message)]),
            )
            .await?;
        Ok(outcome.status)
    }
}
