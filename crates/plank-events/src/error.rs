//! Wire codec error type.

/// A wire payload that could not be parsed into an event.
///
/// Covers malformed JSON, missing fields, and unknown `type` discriminators.
/// The receiving session discards the offending frame with a logged warning;
/// the connection is not closed on account of it.
#[derive(Debug, thiserror::Error)]
#[error("malformed event payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);
