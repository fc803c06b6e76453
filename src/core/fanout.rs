use crate::core::DEFAULT_MAX_CONCURRENCY;
use crate::core::card::{Card, CardBuilder, CardContext};
use crate::upstream::{UpstreamClient, UpstreamError};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    /// Upper bound on fetch-and-build units in flight at once.
    pub max_concurrency: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        FanOutConfig {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// One identifier whose card could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub identifier: String,
    pub error: UpstreamError,
}

/// Merged result of one batch. `cards` never holds more than one card per identifier.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub cards: Vec<Card>,
    /// Identifiers the upstream did not know.
    pub skipped: Vec<String>,
    /// Identifiers that failed for any other reason; they did not abort the batch.
    pub failures: Vec<ItemFailure>,
}

enum ItemOutcome {
    Built(Card),
    Skipped(String),
    Failed(ItemFailure),
}

/// Fetches and builds one card per identifier, concurrently.
///
/// Every unit produces an independent [`ItemOutcome`]; the only point where
/// results meet is the fold at the end of [`collect`](FanOutCollector::collect).
#[derive(Clone)]
pub struct FanOutCollector {
    client: Arc<dyn UpstreamClient>,
    builder: Arc<dyn CardBuilder>,
    max_concurrency: usize,
}

impl FanOutCollector {
    pub fn new(client: Arc<dyn UpstreamClient>, builder: Arc<dyn CardBuilder>) -> Self {
        FanOutCollector {
            client,
            builder,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        FanOutCollector {
            max_concurrency,
            ..self
        }
    }

    pub fn with_config(self, config: FanOutConfig) -> Self {
        self.with_concurrency(config.max_concurrency)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    async fn fetch_one(&self, identifier: String, ctx: &CardContext) -> ItemOutcome {
        log::debug!("Fetching {} from {}", identifier, ctx.base_url);

        let result = match self.builder.item_url(ctx, &identifier) {
            Ok(url) => match self.client.fetch(&url, &ctx.credentials).await {
                Ok(document) => self
                    .builder
                    .build(&document, &identifier, ctx)
                    .map_err(UpstreamError::from),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        match result {
            Ok(card) => ItemOutcome::Built(card),
            Err(UpstreamError::NotFound) => {
                log::debug!("{} not found upstream, no card", identifier);
                ItemOutcome::Skipped(identifier)
            }
            Err(error) => {
                log::warn!("Dropping card for {}: {}", identifier, error);
                ItemOutcome::Failed(ItemFailure { identifier, error })
            }
        }
    }

    /// Builds cards for `identifiers`. Duplicates collapse; an empty set makes no calls.
    pub async fn collect<I, S>(&self, identifiers: I, ctx: &CardContext) -> BatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identifiers: BTreeSet<String> = identifiers.into_iter().map(Into::into).collect();
        if identifiers.is_empty() {
            log::debug!("No identifiers for {}", ctx.base_url);
            return BatchOutcome::default();
        }

        stream::iter(identifiers)
            .map(|identifier| self.fetch_one(identifier, ctx))
            .buffer_unordered(self.max_concurrency)
            .fold(BatchOutcome::default(), |mut outcome, item| async move {
                match item {
                    ItemOutcome::Built(card) => outcome.cards.push(card),
                    ItemOutcome::Skipped(identifier) => outcome.skipped.push(identifier),
                    ItemOutcome::Failed(failure) => outcome.failures.push(failure),
                }
                outcome
            })
            .await
    }
}
