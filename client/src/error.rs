//! Error taxonomy of the data layer. Remote failures are explicit result
//! values; each call site decides its own degradation instead of a blanket
//! catch-and-log policy inside the client.

use thiserror::Error;

/// Failure of a call against the hosted store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success response other than a constraint violation.
    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },
    /// Uniqueness violation on a relation row (double like, double follow).
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    /// Insert asked for `return=representation` but got nothing back.
    #[error("empty_representation")]
    EmptyRepresentation,
}

/// Client-side input rejection, surfaced inline and never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}_required")]
    EmptyField(&'static str),
    #[error("invalid_email")]
    InvalidEmail,
    #[error("password_too_short")]
    PasswordTooShort,
    #[error("password_mismatch")]
    PasswordMismatch,
    #[error("invalid_handle")]
    InvalidHandle,
    #[error("caption_too_long")]
    CaptionTooLong,
}

/// Failure of a realtime channel. There is no retry; a closed channel stays
/// closed until the caller resubscribes.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("channel closed")]
    Closed,
}
