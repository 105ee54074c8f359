//! Errors returned while decoding or mutating trace context values.
use thiserror::Error;

/// Wrapper for the errors of every codec in this crate. This gives callers a
/// single error type when they do not care which header failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A hex-encoded value could not be decoded.
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// The `traceparent` header was rejected.
    #[error(transparent)]
    TraceParent(#[from] TraceParentError),

    /// A `tracestate` key or value was rejected.
    #[error(transparent)]
    TraceState(#[from] TraceStateError),
}

/// Convenience alias for results using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned when converting lowercase hex text into bytes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodingError {
    /// The text does not hold exactly two characters per target byte.
    #[error("expected {expected} hex characters, found {actual}")]
    InvalidLength {
        /// Number of characters required.
        expected: usize,
        /// Number of characters given.
        actual: usize,
    },

    /// A character outside `0-9a-f` was found. Uppercase hex is rejected.
    #[error("invalid hex character {:?}", char::from(*.0))]
    InvalidCharacter(u8),
}

/// Error returned by `traceparent` parsing.
///
/// Parsing is all-or-nothing: there is no partially decoded trace parent.
///
/// See <https://www.w3.org/TR/trace-context/#traceparent-header-field-values>
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TraceParentError {
    /// Wrong number of fields, wrong field widths or misplaced separators.
    #[error("malformed traceparent header")]
    MalformedHeader,

    /// The version `ff` is reserved as invalid.
    #[error("traceparent version {0:02x} is invalid")]
    InvalidVersion(u8),

    /// A field held a character outside `0-9a-f`.
    #[error("invalid character {:?} in traceparent header", char::from(*.0))]
    InvalidCharacter(u8),

    /// The trace-id or parent-id was all zeroes.
    #[error("traceparent carries an all-zero trace-id or parent-id")]
    InvalidIdentifier,
}

impl From<DecodingError> for TraceParentError {
    fn from(err: DecodingError) -> Self {
        match err {
            DecodingError::InvalidCharacter(c) => TraceParentError::InvalidCharacter(c),
            DecodingError::InvalidLength { .. } => TraceParentError::MalformedHeader,
        }
    }
}

/// Error returned by `TraceState` construction and mutation.
///
/// Parsing a `tracestate` header never produces one of these; invalid list
/// members are dropped instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TraceStateError {
    /// The key is invalid.
    ///
    /// See <https://www.w3.org/TR/trace-context/#key> for requirement for keys.
    #[error("{0} is not a valid key in TraceState, see https://www.w3.org/TR/trace-context/#key for more details")]
    InvalidKey(String),

    /// The value is invalid.
    ///
    /// See <https://www.w3.org/TR/trace-context/#value> for requirement for values.
    #[error("{0} is not a valid value in TraceState, see https://www.w3.org/TR/trace-context/#value for more details")]
    InvalidValue(String),

    /// More list members than a `TraceState` may hold were supplied.
    #[error("TraceState holds at most 32 list members, {0} were given")]
    TooManyEntries(usize),
}
