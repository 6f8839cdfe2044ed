//! Error kinds surfaced by the repositories and the reconciliation engine.
//!
//! Store backends report failures as [`anyhow::Error`]; those are folded into
//! [`VaultError::UpstreamUnavailable`] at the repository boundary and are
//! never retried inside the core.

use thiserror::Error;

/// Result alias used by every core operation that can be rejected.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Payload failed validation. Carries every violated rule, not just the first.
    #[error("Invalid input provided: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("Maximum number of articles reached ({limit} limit)")]
    QuotaExceeded { limit: usize },

    #[error("Article already saved: {0}")]
    DuplicateUrl(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Too many requests, please try again later")]
    RateLimited,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl VaultError {
    /// Machine-readable code used in the HTTP error contract.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::InvalidInput(_) => "invalid_input",
            VaultError::QuotaExceeded { .. } => "quota_exceeded",
            VaultError::DuplicateUrl(_) => "duplicate_url",
            VaultError::NotFound(_) => "not_found",
            VaultError::Unauthorized(_) => "unauthorized",
            VaultError::RateLimited => "rate_limited",
            VaultError::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }
}

impl From<anyhow::Error> for VaultError {
    fn from(err: anyhow::Error) -> Self {
        VaultError::UpstreamUnavailable(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::UpstreamUnavailable(format!("malformed record: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_lists_every_violation() {
        let err = VaultError::InvalidInput(vec!["Title is required".into(), "Valid URL is required".into()]);
        let msg = err.to_string();
        assert!(msg.contains("Title is required"));
        assert!(msg.contains("Valid URL is required"));
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn test_store_failure_becomes_upstream() {
        let err: VaultError = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, VaultError::UpstreamUnavailable(ref m) if m.contains("connection refused")));
    }
}
