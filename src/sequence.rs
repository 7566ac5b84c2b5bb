//! Scripted responses.
//!
//! A [`ResponseSequencer`] hands out canned responses one matched call at a
//! time. Its cursor only moves forward; concurrent callers always receive
//! distinct slots.

use crate::config::{ResponseDefinition, TransportFault};
use crate::error::{MockError, MockResult};
use crate::http::{HttpResponse, Method, RequestOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How the configured responses are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// The single configured response is served for every call.
    Repeat,
    /// Each response is served once, in order.
    Once,
}

/// Identifies the call being answered, for error messages.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub client: String,
    pub expectation: String,
    pub method: Method,
    pub uri: String,
    /// Request body, already rendered for diagnostics
    pub body: String,
}

impl CallContext {
    fn cancelled(&self) -> MockError {
        MockError::Cancelled {
            client: self.client.clone(),
            method: self.method,
            uri: self.uri.clone(),
            body: self.body.clone(),
        }
    }

    fn timed_out(&self, after: Duration) -> MockError {
        MockError::TimedOut {
            client: self.client.clone(),
            method: self.method,
            uri: self.uri.clone(),
            body: self.body.clone(),
            after,
        }
    }

    fn transport(&self, reason: String) -> MockError {
        MockError::Transport {
            client: self.client.clone(),
            method: self.method,
            uri: self.uri.clone(),
            body: self.body.clone(),
            reason,
        }
    }
}

/// Ordered, single-consumption list of canned responses.
#[derive(Debug)]
pub struct ResponseSequencer {
    responses: Vec<ResponseDefinition>,
    mode: SequenceMode,
    cursor: AtomicUsize,
    default_content_type: String,
}

impl ResponseSequencer {
    /// Serve `responses` once each, in order.
    pub fn once(responses: Vec<ResponseDefinition>) -> Self {
        Self {
            responses,
            mode: SequenceMode::Once,
            cursor: AtomicUsize::new(0),
            default_content_type: "application/json".to_string(),
        }
    }

    /// Serve `response` for every call.
    pub fn repeating(response: ResponseDefinition) -> Self {
        Self {
            mode: SequenceMode::Repeat,
            ..Self::once(vec![response])
        }
    }

    /// No responses at all; every call is exhausted.
    pub fn empty() -> Self {
        Self::once(Vec::new())
    }

    /// Content type used for bodies that do not imply one.
    pub fn with_default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    pub fn mode(&self) -> SequenceMode {
        self.mode
    }

    /// Number of configured responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Number of times a response was requested.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn is_exhausted(&self) -> bool {
        match self.mode {
            SequenceMode::Repeat => self.responses.is_empty(),
            SequenceMode::Once => self.position() >= self.responses.len(),
        }
    }

    /// Claim the next slot. Returns the zero-based call position and its response.
    fn take(&self) -> (usize, Option<&ResponseDefinition>) {
        let position = self.cursor.fetch_add(1, Ordering::SeqCst);
        let response = match self.mode {
            SequenceMode::Repeat => self.responses.first(),
            SequenceMode::Once => self.responses.get(position),
        };
        (position, response)
    }

    /// Produce the next response, honoring its delay and the caller's deadline.
    pub async fn next(
        &self,
        call: &CallContext,
        options: &RequestOptions,
    ) -> MockResult<HttpResponse> {
        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

        let (position, definition) = self.take();
        let Some(definition) = definition else {
            return Err(MockError::SequenceExhausted {
                client: call.client.clone(),
                expectation: call.expectation.clone(),
                method: call.method,
                uri: call.uri.clone(),
                body: call.body.clone(),
                configured: self.responses.len(),
                call: position + 1,
            });
        };

        if options.cancellation.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(call.cancelled());
        }

        if let Some(delay) = &definition.delay {
            let delay = delay.calculate();
            if !delay.is_zero() {
                debug!(
                    expectation = %call.expectation,
                    delay_ms = delay.as_millis() as u64,
                    "Applying delay"
                );
                pause(delay, deadline, call, options).await?;
            }
        }

        if let Some(fault) = &definition.fault {
            return fail(fault, deadline, call, options).await;
        }

        self.build_response(definition, call)
    }

    fn build_response(
        &self,
        definition: &ResponseDefinition,
        call: &CallContext,
    ) -> MockResult<HttpResponse> {
        let body = match &definition.body {
            Some(body) => body.to_bytes().map_err(|e| MockError::InvalidExpectation {
                expectation: call.expectation.clone(),
                reason: e.to_string(),
            })?,
            None => Vec::new(),
        };

        let mut headers: Vec<(String, String)> = definition
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        headers.sort();

        let has_content_type = headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            if let Some(body_def) = &definition.body {
                let content_type = body_def
                    .content_type()
                    .unwrap_or(self.default_content_type.as_str());
                headers.push(("Content-Type".to_string(), content_type.to_string()));
            }
        }

        Ok(HttpResponse {
            status: definition.status,
            headers,
            body,
        })
    }
}

/// Cooperative suspension that gives way to cancellation and the caller's deadline.
async fn pause(
    duration: Duration,
    deadline: Option<Instant>,
    call: &CallContext,
    options: &RequestOptions,
) -> MockResult<()> {
    let expired = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        _ = options.cancelled() => Err(call.cancelled()),
        _ = expired => Err(call.timed_out(options.timeout.unwrap_or_default())),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

async fn fail(
    fault: &TransportFault,
    deadline: Option<Instant>,
    call: &CallContext,
    options: &RequestOptions,
) -> MockResult<HttpResponse> {
    debug!(expectation = %call.expectation, fault = %fault, "Simulating transport failure");
    if let TransportFault::Timeout { duration_ms } = fault {
        let hang = Duration::from_millis(*duration_ms);
        pause(hang, deadline, call, options).await?;
        return Err(call.timed_out(hang));
    }
    Err(call.transport(fault.to_string()))
}
