use thiserror::Error;

/// Failure talking to the routing backend.
///
/// Both kinds abort the chain that hit them; callers keep whatever was last
/// rendered and wait for the next user action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network failure on {endpoint}: {reason}")]
    NetworkFailure {
        endpoint: &'static str,
        reason: String,
    },
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },
}

impl BackendError {
    pub fn network(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::NetworkFailure {
            endpoint,
            reason: reason.into(),
        }
    }

    pub fn malformed(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint,
            reason: reason.into(),
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::NetworkFailure { endpoint, .. } | Self::MalformedResponse { endpoint, .. } => {
                endpoint
            }
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}
