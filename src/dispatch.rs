//! Boundary entry point: validates requests, then hands them to the
//! fan-out collector or the workflow orchestrator.
//!
//! Header extraction and routing happen in the embedding service; by the time
//! a request reaches the dispatcher its body is a string and its routing
//! context a [`CardContext`].

use crate::config::CardhubConfig;
use crate::connectors::jira::{ISSUE_TOKEN, JiraActions, JiraCardBuilder};
use crate::connectors::slack::SlackWorkflow;
use crate::core::card::{Card, CardContext};
use crate::core::fanout::FanOutCollector;
use crate::core::workflow::{WorkflowError, WorkflowOrchestrator, WorkflowOutcome, WorkflowRequest};
use crate::upstream::{Status, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} is not configured")]
    Unsupported(&'static str),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl DispatchError {
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Validation(_) => 400,
            DispatchError::Unsupported(_) => 501,
            DispatchError::Upstream(err) => err.status(),
            DispatchError::Workflow(err) => err.status(),
        }
    }
}

/// Follow-up operations a card's actions point back to.
#[async_trait]
pub trait ItemActions: Send + Sync {
    async fn comment(
        &self,
        ctx: &CardContext,
        identifier: &str,
        body: &str,
    ) -> Result<Status, UpstreamError>;

    async fn watch(&self, ctx: &CardContext, identifier: &str) -> Result<Status, UpstreamError>;
}

/// Batch request body: `{"tokens": {"issue_id": ["A", "B"]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CardRequest {
    pub tokens: HashMap<String, Vec<String>>,
}

impl CardRequest {
    pub fn tokens(&self, key: &str) -> BTreeSet<String> {
        self.tokens
            .get(key)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Cards {
    pub cards: Vec<Card>,
}

fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, DispatchError> {
    serde_json::from_str(body).map_err(|e| DispatchError::Validation(e.to_string()))
}

fn require_non_blank(what: &str, value: &str) -> Result<(), DispatchError> {
    if value.trim().is_empty() {
        return Err(DispatchError::Validation(format!("{what} must not be blank")));
    }
    Ok(())
}

pub struct RequestDispatcher {
    collector: FanOutCollector,
    token_key: String,
    actions: Option<Arc<dyn ItemActions>>,
    workflow: Option<WorkflowOrchestrator>,
}

impl RequestDispatcher {
    /// A dispatcher answering batch requests for the identifiers under `token_key`.
    pub fn new(collector: FanOutCollector, token_key: impl Into<String>) -> Self {
        RequestDispatcher {
            collector,
            token_key: token_key.into(),
            actions: None,
            workflow: None,
        }
    }

    /// Jira cards and actions plus the Slack channel workflow, sharing one client.
    pub fn from_config(client: Arc<dyn UpstreamClient>, config: &CardhubConfig) -> Self {
        let collector = FanOutCollector::new(client.clone(), Arc::new(JiraCardBuilder::default()))
            .with_config(config.fan_out);
        let workflow = WorkflowOrchestrator::new(Arc::new(SlackWorkflow::new(
            client.clone(),
            config.slack.clone(),
        )))
        .with_config(config.workflow);

        RequestDispatcher::new(collector, ISSUE_TOKEN)
            .with_actions(Arc::new(JiraActions::new(client)))
            .with_workflow(workflow)
    }

    pub fn with_actions(mut self, actions: Arc<dyn ItemActions>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_workflow(mut self, workflow: WorkflowOrchestrator) -> Self {
        self.workflow = Some(workflow);
        self
    }

    /// Parses and answers a batch card request.
    pub async fn cards(&self, body: &str, ctx: &CardContext) -> Result<Cards, DispatchError> {
        let request: CardRequest = parse(body)?;
        self.cards_for(&request, ctx).await
    }

    pub async fn cards_for(
        &self,
        request: &CardRequest,
        ctx: &CardContext,
    ) -> Result<Cards, DispatchError> {
        let identifiers = request.tokens(&self.token_key);
        for identifier in &identifiers {
            require_non_blank("identifier", identifier)?;
        }

        let outcome = self.collector.collect(identifiers, ctx).await;
        if !outcome.failures.is_empty() {
            log::warn!(
                "{} of the requested cards could not be built",
                outcome.failures.len()
            );
        }
        Ok(Cards {
            cards: outcome.cards,
        })
    }

    pub async fn comment(
        &self,
        ctx: &CardContext,
        identifier: &str,
        body: &str,
    ) -> Result<Status, DispatchError> {
        let actions = self.actions.as_ref().ok_or(DispatchError::Unsupported("comment action"))?;
        require_non_blank("identifier", identifier)?;
        Ok(actions.comment(ctx, identifier, body).await?)
    }

    pub async fn watch(&self, ctx: &CardContext, identifier: &str) -> Result<Status, DispatchError> {
        let actions = self.actions.as_ref().ok_or(DispatchError::Unsupported("watch action"))?;
        require_non_blank("identifier", identifier)?;
        Ok(actions.watch(ctx, identifier).await?)
    }

    /// Parses and runs a workflow request.
    pub async fn workflow(&self, body: &str) -> Result<WorkflowOutcome, DispatchError> {
        let request: WorkflowRequest = parse(body)?;
        self.run_workflow(&request).await
    }

    pub async fn run_workflow(
        &self,
        request: &WorkflowRequest,
    ) -> Result<WorkflowOutcome, DispatchError> {
        let workflow = self.workflow.as_ref().ok_or(DispatchError::Unsupported("workflow"))?;
        require_non_blank("name", &request.name)?;
        for participant in &request.participants {
            require_non_blank("participant", participant)?;
        }
        Ok(workflow.run(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{Credentials, MemoryUpstream};
    use serde_json::json;

    fn ctx() -> CardContext {
        CardContext::new(Credentials::new("Basic abc"), "https://jira", "https://hub/")
    }

    fn dispatcher(upstream: Arc<MemoryUpstream>) -> RequestDispatcher {
        RequestDispatcher::from_config(upstream, &CardhubConfig::default())
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_rejected_before_any_call() {
        let upstream = Arc::new(MemoryUpstream::new());
        let dispatcher = dispatcher(upstream.clone());

        for body in ["not json", "{}", r#"{"tokens": {"issue_id": ["A", " "]}}"#] {
            let err = dispatcher.cards(body, &ctx()).await.unwrap_err();
            assert!(matches!(err, DispatchError::Validation(_)), "{body}");
            assert_eq!(err.status(), 400);
        }
        let err = dispatcher
            .workflow(r#"{"name": "", "message": "m", "emails": []}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_token_key_is_an_empty_batch() {
        let upstream = Arc::new(MemoryUpstream::new());
        let cards = dispatcher(upstream.clone())
            .cards(r#"{"tokens": {"other": ["x"]}}"#, &ctx())
            .await
            .unwrap();
        assert!(cards.cards.is_empty());
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_surfaces_are_unsupported() {
        let upstream = Arc::new(MemoryUpstream::new());
        let collector = FanOutCollector::new(upstream, Arc::new(JiraCardBuilder::default()));
        let bare = RequestDispatcher::new(collector, ISSUE_TOKEN);

        let err = bare.watch(&ctx(), "A-1").await.unwrap_err();
        assert_eq!(err.status(), 501);
        let err = bare
            .run_workflow(&WorkflowRequest::new("n", "m", ["a@x.com"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unsupported("workflow")));
    }

    #[tokio::test]
    async fn test_comment_returns_upstream_status() {
        let upstream = Arc::new(MemoryUpstream::new().fail(
            crate::core::card::HttpMethod::Post,
            "https://jira/rest/api/2/issue/A-1/comment",
            UpstreamError::Unauthorized(401),
        ));
        let err = dispatcher(upstream)
            .comment(&ctx(), "A-1", "hello")
            .await
            .unwrap_err();
        assert_eq!(err.status(), 401);
    }

    #[tokio::test]
    async fn test_empty_comment_body_is_forwarded() {
        let url = "https://jira/rest/api/2/issue/A-1/comment";
        let upstream = Arc::new(MemoryUpstream::new().on_mutate(
            crate::core::card::HttpMethod::Post,
            url,
            Status(201),
            None,
        ));
        let status = dispatcher(upstream.clone())
            .comment(&ctx(), "A-1", "")
            .await
            .unwrap();

        assert_eq!(status, Status(201));
        assert_eq!(
            upstream.calls_to(url)[0].payload,
            crate::upstream::Payload::Json(json!({"body": ""}))
        );
    }

    #[test]
    fn test_card_request_token_set_dedupes() {
        let request: CardRequest =
            serde_json::from_value(json!({"tokens": {"issue_id": ["B", "A", "B"]}})).unwrap();
        assert_eq!(
            request.tokens("issue_id").into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string()]
        );
    }
}
