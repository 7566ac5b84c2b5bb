//! HTTP Double
//!
//! Simulated HTTP clients for tests. Code under test issues calls through an
//! [`HttpTransport`]; a [`MockClient`] intercepts them, matches them against
//! registered expectations and answers with canned responses, so tests can
//! later verify that every expected call happened the expected number of times.
//!
//! # Features
//!
//! - **Request Matching**: Match by method, URI, headers, query params and body
//! - **Semantic JSON Bodies**: Key order, whitespace and date/number formatting don't matter
//! - **Response Sequences**: Serve responses in order, each exactly once
//! - **Latency Simulation**: Fixed or random delays honoring cancellation and timeouts
//! - **Failure Injection**: Simulate refused, reset and hanging connections
//! - **Call-count Verification**: `Exactly`, `AtLeastOnce`, `AtMost`, `Never`
//!
//! # Example
//!
//! ```no_run
//! use http_double::{
//!     Expectation, HttpRequest, HttpTransport, Method, MockClientRegistry, ResponseDefinition,
//!     Times,
//! };
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), http_double::MockError> {
//! let registry = MockClientRegistry::default();
//! let people = registry.create_client("people", "https://people.example.com")?;
//! people.expect(
//!     Expectation::request(Method::Post, "/person")
//!         .with_json_body(json!({"firstName": "Bob"}))
//!         .respond_with(ResponseDefinition::ok())
//!         .times(Times::Exactly(1)),
//! )?;
//!
//! let response = people
//!     .send(HttpRequest::post("/person").json(&json!({"firstName": "Bob"})))
//!     .await?;
//! assert_eq!(response.status, 200);
//! registry.verify_all()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```yaml
//! clients:
//!   - name: people
//!     base_address: https://people.example.com
//!     expectations:
//!       - request:
//!           method: POST
//!           uri:
//!             type: exact
//!             value: /person
//!           body:
//!             type: json
//!             content:
//!               firstName: Bob
//!         response:
//!           status: 200
//!         times:
//!           type: exactly
//!           count: 1
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod expectation;
pub mod http;
pub mod matcher;
pub mod registry;
pub mod sequence;
pub mod verify;

pub use compare::{ComparisonOptions, ComparisonResult, Difference, ValueComparator};
pub use config::{
    BodyMatcher, ExpectationDefinition, HeaderMatcher, MockConfig, QueryMatcher, RegistrySettings,
    ResponseBody, ResponseDefinition, Times, TransportFault, UriMatcher,
};
pub use error::{MockError, MockResult, ParseError};
pub use expectation::Expectation;
pub use http::{
    CancellationToken, HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport,
    RequestOptions,
};
pub use registry::{MockClient, MockClientRegistry};
pub use sequence::ResponseSequencer;
pub use verify::{VerificationReport, Violation};
