pub mod card;
pub mod document;
pub mod fanout;
pub mod text;
pub mod workflow;

/// Concurrent units allowed in flight when no limit is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;
