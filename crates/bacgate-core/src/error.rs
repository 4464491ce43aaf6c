// ── Core error types ──
//
// Engine-facing errors. Link-level failures are translated here so
// consumers never see transport internals. Ambiguous-value conversion
// failures are NOT part of this taxonomy: the mapper records them as
// diagnostic text in the point's present value and stops there.

use thiserror::Error;

use bacgate_proto::LinkError;

/// Unified error type for the engine crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Link errors ──────────────────────────────────────────────────
    /// The cycle that hit this aborts; the next scheduled cycle retries.
    /// Never fatal to the process.
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// A malformed or type-mismatched property value. The offending
    /// property is skipped; sibling properties still apply.
    #[error("protocol decode failure: {message}")]
    ProtocolDecode { message: String },

    /// The remote device has not been resolved yet.
    #[error("remote device not resolved")]
    DeviceUnresolved,

    // ── Structural edit errors ───────────────────────────────────────
    /// Rejected structural edit (empty or duplicate name). The tree is
    /// left untouched.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("session store failure: {message}")]
    Session { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub(crate) fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}

// ── Conversion from link-layer errors ───────────────────────────────

impl From<LinkError> for CoreError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Transport { reason } => CoreError::Transport { reason },
            LinkError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            LinkError::Decode { message } => CoreError::ProtocolDecode { message },
            LinkError::Rejected { reason } => CoreError::ProtocolDecode {
                message: format!("rejected by peer: {reason}"),
            },
            LinkError::Closed => CoreError::Transport {
                reason: "link closed".to_owned(),
            },
        }
    }
}
