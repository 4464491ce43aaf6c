// ── Link-level errors ──
//
// Failures crossing the RemoteLink boundary. The engine translates
// these into its own taxonomy; consumers never see transport details.

use thiserror::Error;

/// Errors surfaced by a [`RemoteLink`](crate::link::RemoteLink) implementation.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    /// The transport is down or the peer is unreachable. The cycle that
    /// hit this aborts and is retried on the next scheduled pass.
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The peer answered, but the frame could not be decoded.
    #[error("protocol decode failure: {message}")]
    Decode { message: String },

    /// The peer rejected the request outright.
    #[error("request rejected by peer: {reason}")]
    Rejected { reason: String },

    /// The link has been shut down locally.
    #[error("link closed")]
    Closed,
}

impl LinkError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
