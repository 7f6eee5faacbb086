//! Client view of the two session endpoints.

use std::future::Future;

/// The authority's answer to a validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateReply {
    Valid { subject_id: String },
    /// The authority was reached and refused the token.
    Rejected,
}

/// The refresh endpoint's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReply {
    Issued { token: String, expires_at: i64 },
    /// The endpoint was reached and declined the exchange.
    Rejected { status: u16 },
}

/// The endpoint could not give an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the configured timeout.
    Timeout,
    /// Connection refused, reset, DNS failure and the like.
    Network(String),
    /// A response arrived but its body did not have the documented shape.
    Malformed(String),
    /// A status that is neither success nor a documented rejection (e.g. 503).
    Status(u16),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "Request timed out"),
            TransportError::Network(e) => write!(f, "Network error: {}", e),
            TransportError::Malformed(e) => write!(f, "Malformed response: {}", e),
            TransportError::Status(code) => write!(f, "Unexpected status {}", code),
        }
    }
}

impl std::error::Error for TransportError {}

/// Transport to the token authority.
///
/// Implemented over HTTP by `HttpSessionApi`; tests substitute in-process fakes.
pub trait SessionApi: Send + Sync {
    fn validate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<ValidateReply, TransportError>> + Send;

    fn refresh(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<RefreshReply, TransportError>> + Send;
}
