//! The narrow contract through which every upstream system is reached.
//!
//! This crate never retries; retry/backoff and timeouts belong to the
//! [`UpstreamClient`] implementation supplied by the caller.

pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;

use crate::core::card::HttpMethod;
use crate::core::document::UpstreamDocument;
use async_trait::async_trait;
use std::borrow::Cow;

pub use error::UpstreamError;
#[cfg(feature = "http")]
pub use http::HttpUpstream;
pub use memory::{MemoryUpstream, RecordedCall};

/// The value sent verbatim in the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(authorization: impl Into<String>) -> Self {
        Credentials(authorization.into())
    }

    pub fn bearer(token: &str) -> Self {
        Credentials(format!("Bearer {token}"))
    }

    pub fn authorization(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// An HTTP-style status code returned by a successful call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

impl Status {
    pub const OK: Status = Status(200);
    pub const NO_CONTENT: Status = Status(204);

    pub fn code(&self) -> u16 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl Payload {
    pub fn form<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Payload::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// What a successful mutation returned. `body` is `None` when the upstream sent none.
#[derive(Debug, Clone, PartialEq)]
pub struct MutateOutcome {
    pub status: Status,
    pub body: Option<UpstreamDocument>,
}

impl MutateOutcome {
    pub fn status(status: Status) -> Self {
        MutateOutcome { status, body: None }
    }
}

/// One authenticated call to an upstream system.
///
/// Non-2xx answers are returned as [`UpstreamError`], never as a success.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Reads the document at `url`.
    async fn fetch(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<UpstreamDocument, UpstreamError>;

    /// Performs a write against `url`.
    async fn mutate(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload,
        credentials: &Credentials,
    ) -> Result<MutateOutcome, UpstreamError>;
}

/// Appends a percent-encoded query string to `url`.
pub fn with_query<'a>(url: &str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    if query.is_empty() {
        url.to_string()
    } else {
        format!("{url}?{query}")
    }
}

/// Percent-encodes `raw` as exactly one path segment.
///
/// `.` and `..` are refused with [`UpstreamError::NotFound`]: URL normalization
/// resolves them (encoded or not), so they can never name a single item.
pub fn path_segment(raw: &str) -> Result<Cow<'_, str>, UpstreamError> {
    match raw {
        "" | "." | ".." => Err(UpstreamError::NotFound),
        _ => Ok(urlencoding::encode(raw)),
    }
}
