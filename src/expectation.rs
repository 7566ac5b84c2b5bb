//! Expectations: a request matcher bound to canned responses and a call-count policy.
//!
//! An [`ExpectationDefinition`] is an immutable configuration value, built
//! here with builder functions, written as a struct literal, or loaded from
//! YAML. Registering it on a client compiles it into a live [`Expectation`]
//! that counts invocations and owns its [`ResponseSequencer`].
//!
//! ```
//! use http_double::{Expectation, Method, ResponseDefinition, Times};
//! use serde_json::json;
//!
//! let definition = Expectation::request(Method::Post, "/person")
//!     .with_json_body(json!({"firstName": "Bob"}))
//!     .respond_with(ResponseDefinition::ok())
//!     .times(Times::Exactly(1));
//! assert!(definition.is_complete());
//! ```

use crate::compare::ComparisonOptions;
use crate::config::{
    BodyMatcher, ExpectationDefinition, HeaderMatcher, QueryMatcher, RegistrySettings,
    RequestDefinition, ResponseDefinition, Times, UriMatcher,
};
use crate::error::MockResult;
use crate::http::Method;
use crate::matcher::RequestMatcher;
use crate::sequence::ResponseSequencer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use url::Url;

impl ExpectationDefinition {
    pub fn new(method: Method, uri: UriMatcher) -> Self {
        Self {
            name: None,
            request: RequestDefinition {
                method,
                uri,
                query: HashMap::new(),
                headers: HashMap::new(),
                body: BodyMatcher::None,
            },
            response: None,
            sequence: Vec::new(),
            times: Times::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_body(mut self, body: BodyMatcher) -> Self {
        self.request.body = body;
        self
    }

    /// Semantic JSON body, compared with the registry's default options.
    pub fn with_json_body(self, content: serde_json::Value) -> Self {
        self.with_body(BodyMatcher::Json {
            content,
            options: None,
        })
    }

    pub fn with_json_body_using(
        self,
        content: serde_json::Value,
        options: ComparisonOptions,
    ) -> Self {
        self.with_body(BodyMatcher::Json {
            content,
            options: Some(options),
        })
    }

    pub fn with_exact_body(self, content: impl Into<String>, content_type: Option<&str>) -> Self {
        self.with_body(BodyMatcher::Exact {
            content: content.into(),
            content_type: content_type.map(str::to_string),
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, matcher: HeaderMatcher) -> Self {
        self.request.headers.insert(name.into(), matcher);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, matcher: QueryMatcher) -> Self {
        self.request.query.insert(name.into(), matcher);
        self
    }

    /// Serve `response` for every matched call.
    pub fn respond_with(mut self, response: ResponseDefinition) -> Self {
        self.response = Some(response);
        self.sequence.clear();
        self
    }

    /// Serve each response once, in order; calls past the end fail.
    pub fn respond_with_sequence(
        mut self,
        responses: impl IntoIterator<Item = ResponseDefinition>,
    ) -> Self {
        self.sequence = responses.into_iter().collect();
        self.response = None;
        self
    }

    pub fn times(mut self, times: Times) -> Self {
        self.times = times;
        self
    }
}

/// A registered expectation with its invocation counter.
pub struct Expectation {
    name: Option<String>,
    matcher: RequestMatcher,
    times: Times,
    calls: AtomicU32,
    sequencer: ResponseSequencer,
    complete: bool,
}

impl Expectation {
    /// Start an expectation on an exact URI, absolute or relative to the base address.
    pub fn request(method: Method, uri: impl Into<String>) -> ExpectationDefinition {
        ExpectationDefinition::new(method, UriMatcher::Exact { value: uri.into() })
    }

    /// Start an expectation on a URI pattern.
    pub fn request_matching(method: Method, uri: UriMatcher) -> ExpectationDefinition {
        ExpectationDefinition::new(method, uri)
    }

    /// Compile a definition for a client rooted at `base`.
    pub fn compile(
        definition: &ExpectationDefinition,
        base: &Url,
        settings: &RegistrySettings,
    ) -> MockResult<Self> {
        let matcher = RequestMatcher::compile(&definition.request, base, &settings.comparison)?;

        let sequencer = match &definition.response {
            Some(response) => ResponseSequencer::repeating(response.clone()),
            None => ResponseSequencer::once(definition.sequence.clone()),
        }
        .with_default_content_type(settings.default_content_type.clone());

        Ok(Self {
            name: definition.name.clone(),
            matcher,
            times: definition.times,
            calls: AtomicU32::new(0),
            sequencer,
            complete: definition.is_complete(),
        })
    }

    /// `name: METHOD uri`, or `METHOD uri` when unnamed.
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{}: {}", name, self.matcher.describe()),
            None => self.matcher.describe().to_string(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }

    pub fn sequencer(&self) -> &ResponseSequencer {
        &self.sequencer
    }

    pub fn times(&self) -> Times {
        self.times
    }

    /// Number of calls routed to this expectation so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a response was ever configured.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the call-count policy allows another call.
    pub fn has_capacity(&self) -> bool {
        self.times.has_capacity(self.calls())
    }

    /// Count a routed call; returns the new total.
    pub(crate) fn record_call(&self) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("description", &self.describe())
            .field("times", &self.times)
            .field("calls", &self.calls())
            .field("complete", &self.complete)
            .finish()
    }
}
