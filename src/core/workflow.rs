//! Sequential write workflow with one embedded fan-out/fan-in stage.
//!
//! The pipeline is fixed:
//! 1. **Create** a resource
//! 2. **ResolveParticipants** concurrently, waiting for all of them
//! 3. **Attach** every resolved participant to the resource
//! 4. **Finalize** the resource (e.g. post an initial message)
//!
//! A stage only starts once the previous one has fully completed. The first
//! failure ends the run. Nothing is undone: a resource created in stage 1 is
//! left in place and reported on the [`WorkflowError`] so the caller can clean up.

use crate::core::DEFAULT_MAX_CONCURRENCY;
use crate::upstream::{Status, UpstreamError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Opaque handle of the resource created by the first stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub String);

/// Opaque handle of one resolved participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantHandle(pub String);

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ParticipantHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStage {
    Create,
    ResolveParticipants,
    Attach,
    Finalize,
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStage::Create => "create",
            WorkflowStage::ResolveParticipants => "resolve-participants",
            WorkflowStage::Attach => "attach",
            WorkflowStage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowRequest {
    pub name: String,
    pub message: String,
    #[serde(alias = "emails")]
    pub participants: Vec<String>,
}

impl WorkflowRequest {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        message: impl Into<String>,
        participants: impl IntoIterator<Item = S>,
    ) -> Self {
        WorkflowRequest {
            name: name.into(),
            message: message.into(),
            participants: participants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Upper bound on concurrent participant resolutions.
    pub max_concurrency: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// The four backend operations a resource+participants workflow is made of.
#[async_trait]
pub trait ResourceWorkflow: Send + Sync {
    async fn create(&self, name: &str) -> Result<ResourceHandle, UpstreamError>;

    async fn resolve(&self, participant: &str) -> Result<ParticipantHandle, UpstreamError>;

    async fn attach(
        &self,
        resource: &ResourceHandle,
        participants: &[ParticipantHandle],
    ) -> Result<Status, UpstreamError>;

    async fn finalize(&self, resource: &ResourceHandle, message: &str)
    -> Result<Status, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub resource: ResourceHandle,
    pub participants: Vec<ParticipantHandle>,
    pub completed: Vec<WorkflowStage>,
    /// Status of the final stage.
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("workflow aborted during {stage} stage: {source}")]
pub struct WorkflowError {
    pub stage: WorkflowStage,
    /// Resource created before the failure, still present upstream.
    pub resource: Option<ResourceHandle>,
    pub completed: Vec<WorkflowStage>,
    #[source]
    pub source: UpstreamError,
}

impl WorkflowError {
    pub fn status(&self) -> u16 {
        self.source.status()
    }
}

#[derive(Clone)]
pub struct WorkflowOrchestrator {
    workflow: Arc<dyn ResourceWorkflow>,
    max_concurrency: usize,
}

impl WorkflowOrchestrator {
    pub fn new(workflow: Arc<dyn ResourceWorkflow>) -> Self {
        WorkflowOrchestrator {
            workflow,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        WorkflowOrchestrator {
            max_concurrency,
            ..self
        }
    }

    pub fn with_config(self, config: WorkflowConfig) -> Self {
        self.with_concurrency(config.max_concurrency)
    }

    fn abort(
        stage: WorkflowStage,
        resource: Option<&ResourceHandle>,
        completed: &[WorkflowStage],
        source: UpstreamError,
    ) -> WorkflowError {
        match resource {
            Some(resource) => log::error!(
                "Workflow aborted during {} stage: {}. Resource {} left in place",
                stage,
                source,
                resource
            ),
            None => log::error!("Workflow aborted during {} stage: {}", stage, source),
        }
        WorkflowError {
            stage,
            resource: resource.cloned(),
            completed: completed.to_vec(),
            source,
        }
    }

    pub async fn run(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome, WorkflowError> {
        let mut completed = Vec::with_capacity(4);

        log::info!("Creating resource '{}'", request.name);
        let resource = self
            .workflow
            .create(&request.name)
            .await
            .map_err(|e| Self::abort(WorkflowStage::Create, None, &completed, e))?;
        completed.push(WorkflowStage::Create);

        log::info!(
            "Resolving {} participants for {}",
            request.participants.len(),
            resource
        );
        let participants: Vec<ParticipantHandle> = stream::iter(&request.participants)
            .map(|participant| self.workflow.resolve(participant))
            .buffered(self.max_concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                Self::abort(WorkflowStage::ResolveParticipants, Some(&resource), &completed, e)
            })?;
        completed.push(WorkflowStage::ResolveParticipants);

        if participants.is_empty() {
            log::debug!("No participants to attach to {}", resource);
        } else {
            log::info!("Attaching {} participants to {}", participants.len(), resource);
            self.workflow
                .attach(&resource, &participants)
                .await
                .map_err(|e| Self::abort(WorkflowStage::Attach, Some(&resource), &completed, e))?;
            completed.push(WorkflowStage::Attach);
        }

        log::info!("Finalizing {}", resource);
        let status = self
            .workflow
            .finalize(&resource, &request.message)
            .await
            .map_err(|e| Self::abort(WorkflowStage::Finalize, Some(&resource), &completed, e))?;
        completed.push(WorkflowStage::Finalize);

        Ok(WorkflowOutcome {
            resource,
            participants,
            completed,
            status,
        })
    }
}
