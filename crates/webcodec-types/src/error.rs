// crates/webcodec-types/src/error.rs
//
// Single typed error surface for the whole runtime, returned at every
// module boundary: session construction, control-message dispatch, facade
// calls.

use thiserror::Error;

/// Coarse classification of a [`CodecError`], so callers can branch on
/// `kind()` without string matching (mirrors a W3C DOMException `name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A config or chunk failed validation before it reached the codec.
    Validation,
    /// The call isn't legal in the instance's current `CodecState`.
    InvalidState,
    /// The control queue is already at `codecSaturated` and the message
    /// would overflow it further.
    QuotaExceeded,
    /// `avcodec_open2` (or the encoder/decoder lookup that precedes it)
    /// failed.
    CodecOpen,
    /// A send/receive call into the codec failed after it was opened.
    CodecRun,
    /// `encode()`/`decode()` was called after `flush()` started reinitializing
    /// the codec, before the reinit completed.
    ReinitAfterFlush,
    /// The operation was abandoned because `reset()` or `close()` ran first.
    Aborted,
    /// The worker thread is gone — the instance outlived its host.
    HostTeardown,
}

/// The one error type every public entry point in `webcodec-runtime` returns.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("control queue saturated: {0}")]
    QuotaExceeded(String),

    #[error("failed to open codec: {0}")]
    CodecOpen(String),

    #[error("codec run error: {0}")]
    CodecRun(String),

    #[error("encode/decode requested during flush reinitialization")]
    ReinitAfterFlush,

    #[error("operation aborted: {0}")]
    Aborted(String),

    #[error("codec worker is no longer running")]
    HostTeardown,
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Validation(_) => ErrorKind::Validation,
            CodecError::InvalidState(_) => ErrorKind::InvalidState,
            CodecError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            CodecError::CodecOpen(_) => ErrorKind::CodecOpen,
            CodecError::CodecRun(_) => ErrorKind::CodecRun,
            CodecError::ReinitAfterFlush => ErrorKind::ReinitAfterFlush,
            CodecError::Aborted(_) => ErrorKind::Aborted,
            CodecError::HostTeardown => ErrorKind::HostTeardown,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        CodecError::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CodecError::Validation(msg.into())
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        CodecError::Aborted(msg.into())
    }
}
