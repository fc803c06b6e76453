use crate::core::document::DocumentError;
use thiserror::Error;

/// Failure of a single upstream call, typed by cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream resource not found")]
    NotFound,

    #[error("upstream rejected the credentials (status {0})")]
    Unauthorized(u16),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream refused the operation: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed upstream document: {0}")]
    Malformed(#[from] DocumentError),
}

impl UpstreamError {
    /// Maps an HTTP status to the matching failure, or `None` for 2xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 => Some(UpstreamError::NotFound),
            401 | 403 => Some(UpstreamError::Unauthorized(status)),
            _ => Some(UpstreamError::Status(status)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound)
    }

    /// The status a boundary should answer with for this failure.
    pub fn status(&self) -> u16 {
        match self {
            UpstreamError::NotFound => 404,
            UpstreamError::Unauthorized(s) | UpstreamError::Status(s) => *s,
            UpstreamError::Rejected(_) | UpstreamError::Malformed(_) => 502,
            UpstreamError::Transport(_) => 504,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if let Some(mapped) = UpstreamError::from_status(status.as_u16()) {
                return mapped;
            }
        }
        if err.is_decode() {
            UpstreamError::Rejected(format!("undecodable body: {err}"))
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(UpstreamError::from_status(204), None);
        assert_eq!(UpstreamError::from_status(404), Some(UpstreamError::NotFound));
        assert_eq!(UpstreamError::from_status(403), Some(UpstreamError::Unauthorized(403)));
        assert_eq!(UpstreamError::from_status(500), Some(UpstreamError::Status(500)));
    }

    #[test]
    fn test_boundary_status() {
        assert_eq!(UpstreamError::Status(409).status(), 409);
        assert_eq!(UpstreamError::Transport("timeout".into()).status(), 504);
        assert_eq!(
            UpstreamError::Malformed(DocumentError::Missing("$.key".into())).status(),
            502
        );
    }
}
