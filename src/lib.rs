//! # Cardhub
//!
//! Aggregates data from ticket, chat and ITSM backends into uniform notification
//! cards, and drives short multi-step write workflows against those backends.
//!
//! ## Features
//!
//! - **Partial-failure tolerant fan-out**: one batch request, many concurrent upstream
//!   lookups; unknown items are skipped and no single failure sinks the batch
//! - **Fail-fast workflows**: strictly sequential stages with one concurrent
//!   fan-out/fan-in stage, aborting on the first hard failure
//! - **Immutable cards**: assembled through staged builders, frozen on build
//! - **Optional HTTP transport**: a `reqwest` backed client (feature `http`, on by default)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardhub::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), DispatchError> {
//! let client = Arc::new(HttpUpstream::new());
//! let dispatcher = RequestDispatcher::from_config(client, &CardhubConfig::default());
//!
//! let ctx = CardContext::new(
//!     Credentials::new("Basic dXNlcjpwYXNz"),
//!     "https://jira.example.com",
//!     "https://hub.example.com/connectors/jira/",
//! );
//! let cards = dispatcher
//!     .cards(r#"{"tokens": {"issue_id": ["APF-27", "APF-28"]}}"#, &ctx)
//!     .await?;
//! println!("{} cards", cards.cards.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`core`](crate::core): documents, cards, the fan-out collector and the workflow orchestrator
//! - [`upstream`]: the [`UpstreamClient`] contract and its implementations
//! - [`connectors`]: Jira cards/actions and the Slack channel workflow
//! - [`dispatch`]: request validation and dispatch
//! - [`config`]: construction-time configuration

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod connectors;
pub mod core;
pub mod dispatch;
pub mod upstream;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use config::{CardhubConfig, ConfigError};
pub use crate::core::card::{
    Card, CardAction, CardActionKey, CardBody, CardBodyField, CardBodyFieldType, CardBuilder,
    CardContext, CardHeader, HttpMethod,
};
pub use crate::core::document::{DocumentError, UpstreamDocument};
pub use crate::core::fanout::{BatchOutcome, FanOutCollector, FanOutConfig, ItemFailure};
pub use crate::core::text::{DefaultCatalog, TextCatalog};
pub use crate::core::workflow::{
    ParticipantHandle, ResourceHandle, ResourceWorkflow, WorkflowConfig, WorkflowError,
    WorkflowOrchestrator, WorkflowOutcome, WorkflowRequest, WorkflowStage,
};
pub use dispatch::{CardRequest, Cards, DispatchError, ItemActions, RequestDispatcher};
#[cfg(feature = "http")]
pub use upstream::HttpUpstream;
pub use upstream::{
    Credentials, MemoryUpstream, MutateOutcome, Payload, Status, UpstreamClient, UpstreamError,
};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// Imports everything needed to wire up a dispatcher.
///
/// # Example
/// ```rust
/// use cardhub::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "http")]
    pub use super::HttpUpstream;
    pub use super::{
        Card, CardBuilder, CardContext, CardhubConfig, Credentials, DispatchError,
        FanOutCollector, ItemActions, MemoryUpstream, RequestDispatcher, ResourceWorkflow,
        Status, UpstreamClient, UpstreamDocument, UpstreamError, WorkflowOrchestrator,
        WorkflowRequest,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
