//! [`UpstreamClient`] over `reqwest`.

use crate::core::card::HttpMethod;
use crate::core::document::UpstreamDocument;
use crate::upstream::{Credentials, MutateOutcome, Payload, Status, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};

#[derive(Clone, Default)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        HttpUpstream {
            client: reqwest::Client::new(),
        }
    }

    /// Uses a preconfigured client, e.g. one carrying timeouts.
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpUpstream { client }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// An empty 2xx body reads as a `null` document.
    fn document(text: &str) -> Result<UpstreamDocument, UpstreamError> {
        if text.trim().is_empty() {
            return Ok(UpstreamDocument::new(serde_json::Value::Null));
        }
        UpstreamDocument::parse(text)
            .map_err(|err| UpstreamError::Rejected(format!("undecodable body: {err}")))
    }

    fn check(response: &reqwest::Response, url: &str) -> Result<Status, UpstreamError> {
        let status = response.status().as_u16();
        match UpstreamError::from_status(status) {
            None => Ok(Status(status)),
            Some(err) => {
                log::debug!("{} answered {}", url, status);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn fetch(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<UpstreamDocument, UpstreamError> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, credentials.authorization())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::check(&response, url)?;
        let text = response.text().await?;
        Self::document(&text)
    }

    async fn mutate(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload,
        credentials: &Credentials,
    ) -> Result<MutateOutcome, UpstreamError> {
        log::debug!("{} {}", method, url);
        let request = self
            .client
            .request(Self::method(method), url)
            .header(AUTHORIZATION, credentials.authorization());

        let request = match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(&body),
            Payload::Form(pairs) => request.form(&pairs),
        };

        let response = request.send().await?;
        let status = Self::check(&response, url)?;

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            None
        } else {
            match UpstreamDocument::parse(&text) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    log::debug!("{} returned a non-JSON body: {}", url, err);
                    None
                }
            }
        };

        Ok(MutateOutcome { status, body })
    }
}
