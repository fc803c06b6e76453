//! A scripted in-memory upstream that records every call.

use crate::core::card::HttpMethod;
use crate::core::document::UpstreamDocument;
use crate::upstream::{Credentials, MutateOutcome, Payload, Status, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A call observed by [`MemoryUpstream`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub payload: Payload,
    pub authorization: String,
}

type Scripted = Result<(Status, Option<Value>), UpstreamError>;

/// Answers from a fixed script keyed by method and URL; anything unscripted is `NotFound`.
#[derive(Default)]
pub struct MemoryUpstream {
    script: HashMap<(HttpMethod, String), Scripted>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_fetch(mut self, url: impl Into<String>, body: Value) -> Self {
        self.script
            .insert((HttpMethod::Get, url.into()), Ok((Status::OK, Some(body))));
        self
    }

    pub fn on_mutate(
        mut self,
        method: HttpMethod,
        url: impl Into<String>,
        status: Status,
        body: Option<Value>,
    ) -> Self {
        self.script.insert((method, url.into()), Ok((status, body)));
        self
    }

    pub fn fail(mut self, method: HttpMethod, url: impl Into<String>, err: UpstreamError) -> Self {
        self.script.insert((method, url.into()), Err(err));
        self
    }

    /// Holds every call to `url` for `delay` before answering.
    pub fn delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload,
        credentials: &Credentials,
    ) -> Scripted {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                method,
                url: url.to_string(),
                payload,
                authorization: credentials.authorization().to_string(),
            });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.script
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or(Err(UpstreamError::NotFound))
    }
}

#[async_trait]
impl UpstreamClient for MemoryUpstream {
    async fn fetch(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<UpstreamDocument, UpstreamError> {
        let (_, body) = self
            .answer(HttpMethod::Get, url, Payload::Empty, credentials)
            .await?;
        Ok(UpstreamDocument::new(body.unwrap_or(Value::Null)))
    }

    async fn mutate(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload,
        credentials: &Credentials,
    ) -> Result<MutateOutcome, UpstreamError> {
        let (status, body) = self.answer(method, url, payload, credentials).await?;
        Ok(MutateOutcome {
            status,
            body: body.map(UpstreamDocument::new),
        })
    }
}
