//! Error types.
//!
//! Match and sequence errors surface at the moment of the offending call and
//! look like a failed network call to the code under test. Verification and
//! "not complete" errors only surface when verification is invoked.

use crate::compare::ComparisonResult;
use crate::config::Times;
use crate::http::Method;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by simulated clients and verification.
#[derive(Debug, Error)]
pub enum MockError {
    /// An expectation was declared without ever being given a response.
    #[error(
        "mock not complete: `{expectation}` on client `{client}` was declared without a response\n  body: {body}"
    )]
    NotComplete {
        client: String,
        expectation: String,
        body: String,
    },

    /// No expectation accepts the call.
    #[error("no expectation on client `{client}` matches {method} {uri}\n  body: {body}")]
    NoMatch {
        client: String,
        method: Method,
        uri: String,
        body: String,
    },

    /// Method and URI matched an expectation but the JSON body did not.
    #[error(
        "request body does not match `{expectation}` on client `{client}` for {method} {uri}\n  expected body: {expected}\n  actual body:   {actual}\n{differences}"
    )]
    BodyMismatch {
        client: String,
        expectation: String,
        method: Method,
        uri: String,
        expected: String,
        actual: String,
        differences: ComparisonResult,
    },

    /// More calls than configured responses.
    #[error(
        "response sequence exhausted for `{expectation}` on client `{client}`: {configured} response(s) configured, call #{call} was {method} {uri}\n  body: {body}"
    )]
    SequenceExhausted {
        client: String,
        expectation: String,
        method: Method,
        uri: String,
        body: String,
        configured: usize,
        call: usize,
    },

    /// Invocation count does not satisfy the call-count policy.
    #[error(
        "expectation `{expectation}` on client `{client}` should be called {policy} but was called {calls} time(s)\n  body: {body}"
    )]
    Verification {
        client: String,
        expectation: String,
        body: String,
        policy: Times,
        calls: u32,
    },

    /// Malformed structured value given to the comparator.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The caller cancelled the call while it was in flight.
    #[error("{method} {uri} on client `{client}` was cancelled\n  body: {body}")]
    Cancelled {
        client: String,
        method: Method,
        uri: String,
        body: String,
    },

    /// The caller's deadline elapsed while the call was in flight.
    #[error("{method} {uri} on client `{client}` timed out after {after:?}\n  body: {body}")]
    TimedOut {
        client: String,
        method: Method,
        uri: String,
        body: String,
        after: Duration,
    },

    /// Connection-level failure (simulated or real).
    #[error(
        "{method} {uri} on client `{client}` failed at the transport level: {reason}\n  body: {body}"
    )]
    Transport {
        client: String,
        method: Method,
        uri: String,
        body: String,
        reason: String,
    },

    #[error("invalid uri `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid expectation `{expectation}`: {reason}")]
    InvalidExpectation { expectation: String, reason: String },

    #[error("no client named `{0}` is registered")]
    UnknownClient(String),
}

/// Result alias for simulated client operations.
pub type MockResult<T> = Result<T, MockError>;

/// Which side of a comparison a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Expected,
    Actual,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Expected => f.write_str("expected"),
            Side::Actual => f.write_str("actual"),
        }
    }
}

/// Malformed input handed to the comparator.
#[derive(Debug, Error)]
#[error("malformed {side} value: {source}")]
pub struct ParseError {
    pub side: Side,
    #[source]
    pub source: serde_json::Error,
}

impl ParseError {
    pub fn new(side: Side, source: serde_json::Error) -> Self {
        Self { side, source }
    }
}
