//! Simulated client registry.
//!
//! A [`MockClientRegistry`] owns named [`MockClient`]s. Each client intercepts
//! the calls issued through it, routes them to the first expectation that
//! accepts them and answers from that expectation's response sequence.

use crate::config::{ExpectationDefinition, MockConfig, RegistrySettings};
use crate::error::{MockError, MockResult};
use crate::expectation::Expectation;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestOptions};
use crate::matcher::{BodyMismatch, IncomingCall, MatchOutcome};
use crate::sequence::CallContext;
use crate::verify::{self, VerificationReport};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use url::Url;

/// Lock a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_base(base_address: &str) -> MockResult<Url> {
    Url::parse(base_address).map_err(|e| MockError::InvalidUri {
        uri: base_address.to_string(),
        reason: e.to_string(),
    })
}

/// Owner of every simulated client in a test.
pub struct MockClientRegistry {
    settings: Arc<RegistrySettings>,
    /// Clients in creation order
    clients: Mutex<Vec<MockClient>>,
}

impl MockClientRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings: Arc::new(settings),
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Build a registry, its clients and their expectations from configuration.
    pub fn from_config(config: MockConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let registry = Self::new(config.settings);

        for definition in config.clients {
            let client = if definition.passthrough {
                let transport = ReqwestTransport::new()
                    .map_err(|e| anyhow::anyhow!("Client `{}`: {}", definition.name, e))?
                    .named(definition.name.as_str());
                registry.create_passthrough_client(
                    &definition.name,
                    &definition.base_address,
                    Arc::new(transport),
                )?
            } else {
                registry.create_client(&definition.name, &definition.base_address)?
            };
            for expectation in definition.expectations {
                client.expect(expectation)?;
            }
        }

        info!(
            clients = registry.client_names().len(),
            "Mock client registry initialized"
        );
        Ok(registry)
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Create a client, or reset an existing one of the same name in place.
    ///
    /// Handles obtained earlier for that name observe the new configuration.
    pub fn create_client(&self, name: &str, base_address: &str) -> MockResult<MockClient> {
        self.install(name, parse_base(base_address)?, None)
    }

    /// Create a client that forwards every call to `transport` without matching.
    pub fn create_passthrough_client(
        &self,
        name: &str,
        base_address: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> MockResult<MockClient> {
        self.install(name, parse_base(base_address)?, Some(transport))
    }

    fn install(
        &self,
        name: &str,
        base: Url,
        transport: Option<Arc<dyn HttpTransport>>,
    ) -> MockResult<MockClient> {
        let mut clients = lock(&self.clients);
        let passthrough = transport.is_some();

        if let Some(existing) = clients.iter().find(|c| c.name() == name) {
            existing.replace(ClientState::new(base, transport));
            debug!(client = %name, passthrough, "Client re-created");
            return Ok(existing.clone());
        }

        let client = MockClient {
            inner: Arc::new(ClientInner {
                name: name.to_string(),
                settings: Arc::clone(&self.settings),
                state: Mutex::new(ClientState::new(base, transport)),
            }),
        };
        clients.push(client.clone());
        debug!(client = %name, passthrough, "Client created");
        Ok(client)
    }

    /// Handle to a previously created client.
    pub fn client(&self, name: &str) -> MockResult<MockClient> {
        lock(&self.clients)
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| MockError::UnknownClient(name.to_string()))
    }

    pub fn client_names(&self) -> Vec<String> {
        lock(&self.clients).iter().map(|c| c.name().to_string()).collect()
    }

    /// Discard every client. Outstanding handles lose their expectations.
    pub fn reset(&self) {
        let mut clients = lock(&self.clients);
        for client in clients.iter() {
            lock(&client.inner.state).expectations.clear();
        }
        clients.clear();
        debug!("Registry reset");
    }

    /// Snapshot of every client's expectations, in creation order.
    fn snapshot(&self) -> Vec<(String, Vec<Arc<Expectation>>)> {
        lock(&self.clients)
            .iter()
            .map(|c| (c.name().to_string(), c.expectations()))
            .collect()
    }

    /// Check every expectation's call count, failing on the first violation.
    pub fn verify_all(&self) -> MockResult<()> {
        let snapshot = self.snapshot();
        verify::verify_all(
            snapshot.iter().map(|(name, expectations)| (name.as_str(), expectations.as_slice())),
            &self.settings,
        )
    }

    /// Check every expectation's call count and collect all violations.
    pub fn verification_report(&self) -> VerificationReport {
        let snapshot = self.snapshot();
        verify::report(
            snapshot.iter().map(|(name, expectations)| (name.as_str(), expectations.as_slice())),
            &self.settings,
        )
    }
}

impl Default for MockClientRegistry {
    fn default() -> Self {
        Self::new(RegistrySettings::default())
    }
}

struct ClientState {
    base: Url,
    passthrough: Option<Arc<dyn HttpTransport>>,
    expectations: Vec<Arc<Expectation>>,
}

impl ClientState {
    fn new(base: Url, passthrough: Option<Arc<dyn HttpTransport>>) -> Self {
        Self {
            base,
            passthrough,
            expectations: Vec::new(),
        }
    }
}

struct ClientInner {
    name: String,
    settings: Arc<RegistrySettings>,
    state: Mutex<ClientState>,
}

/// Handle to a simulated client.
///
/// Cloning is cheap; clones share configuration and counters. Hand it to the
/// code under test as an `Arc<dyn HttpTransport>`.
#[derive(Clone)]
pub struct MockClient {
    inner: Arc<ClientInner>,
}

impl MockClient {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn base_address(&self) -> Url {
        lock(&self.inner.state).base.clone()
    }

    pub fn is_passthrough(&self) -> bool {
        lock(&self.inner.state).passthrough.is_some()
    }

    fn replace(&self, state: ClientState) {
        *lock(&self.inner.state) = state;
    }

    /// Register an expectation. Expectations are consulted in registration order.
    pub fn expect(&self, definition: ExpectationDefinition) -> MockResult<Arc<Expectation>> {
        let mut state = lock(&self.inner.state);
        let expectation = Expectation::compile(&definition, &state.base, &self.inner.settings)?;
        definition.validate().map_err(|e| MockError::InvalidExpectation {
            expectation: expectation.describe(),
            reason: e.to_string(),
        })?;

        let expectation = Arc::new(expectation);
        state.expectations.push(Arc::clone(&expectation));
        debug!(
            client = %self.inner.name,
            expectation = %expectation.describe(),
            times = %expectation.times(),
            "Expectation registered"
        );
        Ok(expectation)
    }

    /// Registered expectations, in registration order.
    pub fn expectations(&self) -> Vec<Arc<Expectation>> {
        lock(&self.inner.state).expectations.clone()
    }

    /// Verify this client's expectations, including that each was given a response.
    pub fn verify(&self) -> MockResult<()> {
        for expectation in self.expectations() {
            self.verify_expectation(&expectation)?;
        }
        Ok(())
    }

    /// Verify one expectation returned by [`expect`](Self::expect).
    pub fn verify_expectation(&self, expectation: &Expectation) -> MockResult<()> {
        verify::verify_expectation(&self.inner.name, expectation, &self.inner.settings)
    }

    /// Pick the expectation that answers `request` and count the call.
    ///
    /// The scan and the counter update happen under the client lock, so
    /// concurrent callers never both claim an expectation's last slot.
    fn dispatch(
        &self,
        request: &HttpRequest,
        url: &Url,
        state: &ClientState,
    ) -> MockResult<Arc<Expectation>> {
        let settings = &self.inner.settings;
        let call = IncomingCall {
            method: request.method,
            url,
            headers: &request.headers,
            body: request.body.as_deref(),
        };

        let mut exhausted: Option<&Arc<Expectation>> = None;
        let mut mismatch: Option<(&Arc<Expectation>, BodyMismatch)> = None;
        let mut chosen = None;

        for expectation in &state.expectations {
            match expectation.matcher().evaluate(&call) {
                MatchOutcome::Matched if expectation.has_capacity() => {
                    chosen = Some(expectation);
                    break;
                }
                MatchOutcome::Matched => {
                    exhausted.get_or_insert(expectation);
                }
                MatchOutcome::BodyMismatch(details) => {
                    if mismatch.is_none() {
                        mismatch = Some((expectation, details));
                    }
                }
                MatchOutcome::Rejected => {}
            }
        }

        if let Some(expectation) = chosen.or(exhausted) {
            let calls = expectation.record_call();
            if !expectation.times().has_capacity(calls - 1) {
                warn!(
                    client = %self.inner.name,
                    expectation = %expectation.describe(),
                    calls,
                    times = %expectation.times(),
                    "Expectation called more often than allowed"
                );
            } else if settings.log_matches {
                info!(
                    client = %self.inner.name,
                    expectation = %expectation.describe(),
                    calls,
                    "Call matched expectation"
                );
            }
            return Ok(Arc::clone(expectation));
        }

        if settings.log_unmatched {
            warn!(
                client = %self.inner.name,
                method = %request.method,
                uri = %url,
                "No matching expectation found"
            );
        }

        Err(match mismatch {
            Some((expectation, details)) => MockError::BodyMismatch {
                client: self.inner.name.clone(),
                expectation: expectation.describe(),
                method: request.method,
                uri: url.to_string(),
                expected: settings.render_body(&details.expected),
                actual: settings.render_body(&details.actual),
                differences: details.differences,
            },
            None => MockError::NoMatch {
                client: self.inner.name.clone(),
                method: request.method,
                uri: url.to_string(),
                body: settings.render_body(&request.body_text()),
            },
        })
    }
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("MockClient")
            .field("name", &self.inner.name)
            .field("base", &state.base.as_str())
            .field("passthrough", &state.passthrough.is_some())
            .field("expectations", &state.expectations)
            .finish()
    }
}

#[async_trait]
impl HttpTransport for MockClient {
    async fn send_with(
        &self,
        mut request: HttpRequest,
        options: RequestOptions,
    ) -> MockResult<HttpResponse> {
        let (url, selected) = {
            let state = lock(&self.inner.state);
            let url = state.base.join(&request.uri).map_err(|e| MockError::InvalidUri {
                uri: request.uri.clone(),
                reason: e.to_string(),
            })?;
            let selected = match &state.passthrough {
                Some(transport) => Err(Arc::clone(transport)),
                None => Ok(self.dispatch(&request, &url, &state)?),
            };
            (url, selected)
        };

        let expectation = match selected {
            Ok(expectation) => expectation,
            Err(transport) => {
                debug!(client = %self.inner.name, uri = %url, "Passing call through");
                request.uri = url.to_string();
                return transport.send_with(request, options).await;
            }
        };

        let call = CallContext {
            client: self.inner.name.clone(),
            expectation: expectation.describe(),
            method: request.method,
            uri: url.to_string(),
            body: self.inner.settings.render_body(&request.body_text()),
        };
        expectation.sequencer().next(&call, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResponseDefinition, Times, TransportFault};
    use crate::http::{CancellationToken, Method};
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    fn registry() -> MockClientRegistry {
        MockClientRegistry::default()
    }

    #[tokio::test]
    async fn test_matching_body_verifies() {
        let registry = registry();
        let people = registry.create_client("people", "https://people.example.com").unwrap();
        people
            .expect(
                Expectation::request(Method::Post, "/person")
                    .with_json_body(json!({"firstName": "Bob"}))
                    .respond_with(ResponseDefinition::ok())
                    .times(Times::Exactly(1)),
            )
            .unwrap();

        let response = people
            .send(HttpRequest::post("/person").json(&json!({"firstName": "Bob"})))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        registry.verify_all().unwrap();
        people.verify().unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_body_quotes_both() {
        let registry = registry();
        let people = registry.create_client("people", "https://people.example.com").unwrap();
        people
            .expect(
                Expectation::request(Method::Post, "/person")
                    .with_json_body(json!({"firstName": "Bob"}))
                    .respond_with(ResponseDefinition::ok()),
            )
            .unwrap();

        let err = people
            .send(HttpRequest::post("/person").json(&json!({"firstName": "Alice"})))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, MockError::BodyMismatch { .. }));
        assert!(message.contains(r#"{"firstName":"Bob"}"#));
        assert!(message.contains(r#"{"firstName":"Alice"}"#));
        assert!(message.contains("$.firstName"));
        assert!(message.contains("https://people.example.com/person"));
        assert_eq!(people.expectations()[0].calls(), 0);
    }

    #[tokio::test]
    async fn test_uncalled_expectation_is_reported() {
        let registry = registry();
        let shop = registry.create_client("shop", "https://shop.example.com").unwrap();
        for sku in ["first", "second"] {
            shop.expect(
                Expectation::request(Method::Post, "/products/xyz")
                    .with_json_body(json!({"sku": sku}))
                    .respond_with(ResponseDefinition::new(201))
                    .times(Times::Exactly(1)),
            )
            .unwrap();
        }

        shop.send(HttpRequest::post("/products/xyz").json(&json!({"sku": "first"})))
            .await
            .unwrap();

        let err = registry.verify_all().unwrap_err();
        let message = err.to_string();
        assert!(message.contains(r#"{"sku":"second"}"#), "{}", message);
        assert!(message.contains("called 0 time(s)"));
    }

    #[tokio::test]
    async fn test_second_expectation_takes_over() {
        let registry = registry();
        let auth = registry.create_client("auth", "https://auth.example.com").unwrap();
        auth.expect(
            Expectation::request(Method::Get, "/token")
                .respond_with(ResponseDefinition::ok())
                .times(Times::Exactly(1)),
        )
        .unwrap();
        auth.expect(
            Expectation::request(Method::Get, "/token").respond_with(ResponseDefinition::new(503)),
        )
        .unwrap();

        let mut statuses = Vec::new();
        for _ in 0..3 {
            statuses.push(auth.send(HttpRequest::get("/token")).await.unwrap().status);
        }
        assert_eq!(statuses, vec![200, 503, 503]);
        registry.verify_all().unwrap();
    }

    #[tokio::test]
    async fn test_over_invocation_is_counted() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        let once = api
            .expect(
                Expectation::request(Method::Delete, "/items/1")
                    .respond_with(ResponseDefinition::new(204))
                    .times(Times::Exactly(1)),
            )
            .unwrap();
        let never = api
            .expect(
                Expectation::request(Method::Get, "/admin")
                    .respond_with(ResponseDefinition::ok())
                    .times(Times::Never),
            )
            .unwrap();

        api.send(HttpRequest::delete("/items/1")).await.unwrap();
        api.send(HttpRequest::delete("/items/1")).await.unwrap();
        api.send(HttpRequest::get("/admin")).await.unwrap();

        assert_eq!(once.calls(), 2);
        assert_eq!(never.calls(), 1);
        let report = registry.verification_report();
        assert_eq!(report.violations().len(), 2);
        assert!(registry.verify_all().is_err());
    }

    #[tokio::test]
    async fn test_no_match() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(Expectation::request(Method::Get, "/a").respond_with(ResponseDefinition::ok()))
            .unwrap();

        let err = api.send(HttpRequest::put("/b").body("payload")).await.unwrap_err();
        assert!(matches!(err, MockError::NoMatch { .. }));
        let message = err.to_string();
        assert!(message.contains("PUT https://api.example.com/b"));
        assert!(message.contains("payload"));
    }

    #[tokio::test]
    async fn test_sequence_through_client() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(Expectation::request(Method::Get, "/jobs/7").respond_with_sequence([
            ResponseDefinition::json(202, json!({"state": "running"})),
            ResponseDefinition::json(200, json!({"state": "done"})),
        ]))
        .unwrap();

        assert_eq!(api.send(HttpRequest::get("/jobs/7")).await.unwrap().status, 202);
        assert_eq!(api.send(HttpRequest::get("/jobs/7")).await.unwrap().status, 200);
        let err = api.send(HttpRequest::get("/jobs/7")).await.unwrap_err();
        match err {
            MockError::SequenceExhausted { configured, call, .. } => {
                assert_eq!(configured, 2);
                assert_eq!(call, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fan_out() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        let responses = (0..50).map(|i| ResponseDefinition::json(200, json!({ "slot": i })));
        let expectation = api
            .expect(
                Expectation::request(Method::Get, "/slots")
                    .respond_with_sequence(responses)
                    .times(Times::Exactly(50)),
            )
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let client = api.clone();
            tasks.push(tokio::spawn(async move { client.send(HttpRequest::get("/slots")).await }));
        }

        let mut slots = HashSet::new();
        for task in tasks {
            let response = task.await.unwrap().unwrap();
            let body: serde_json::Value = response.json().unwrap();
            assert!(slots.insert(body["slot"].as_u64().unwrap()));
        }
        assert_eq!(slots.len(), 50);
        assert_eq!(expectation.calls(), 50);
        registry.verify_all().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_and_cancellation() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(
            Expectation::request(Method::Get, "/slow")
                .respond_with(ResponseDefinition::ok().with_delay(Duration::from_millis(500))),
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        api.send(HttpRequest::get("/slow")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        let start = tokio::time::Instant::now();
        let err = api
            .send_with(
                HttpRequest::get("/slow"),
                RequestOptions::default().with_cancellation(token),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MockError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_simulated_transport_failure() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(
            Expectation::request(Method::Get, "/down")
                .respond_with(ResponseDefinition::failure(TransportFault::ConnectionRefused)),
        )
        .unwrap();

        let err = api.send(HttpRequest::get("/down")).await.unwrap_err();
        assert!(matches!(err, MockError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_failed_call_names_client_and_body() {
        let registry = registry();
        let billing = registry.create_client("billing", "https://api.example.com").unwrap();
        billing
            .expect(
                Expectation::request(Method::Post, "/down")
                    .respond_with(ResponseDefinition::failure(TransportFault::ConnectionRefused)),
            )
            .unwrap();
        billing
            .expect(
                Expectation::request(Method::Post, "/slow").respond_with(ResponseDefinition::ok()),
            )
            .unwrap();

        let err = billing
            .send(HttpRequest::post("/down").body("INVOICE-4711"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, MockError::Transport { .. }));
        assert!(message.contains("billing"), "{}", message);
        assert!(message.contains("INVOICE-4711"), "{}", message);
        assert!(message.contains("POST https://api.example.com/down"), "{}", message);

        let token = CancellationToken::new();
        token.cancel();
        let err = billing
            .send_with(
                HttpRequest::post("/slow").body("INVOICE-4712"),
                RequestOptions::default().with_cancellation(token),
            )
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, MockError::Cancelled { .. }));
        assert!(message.contains("billing"), "{}", message);
        assert!(message.contains("INVOICE-4712"), "{}", message);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_call_names_client_and_body() {
        let registry = registry();
        let billing = registry.create_client("billing", "https://api.example.com").unwrap();
        billing
            .expect(Expectation::request(Method::Post, "/hang").respond_with(
                ResponseDefinition::failure(TransportFault::Timeout { duration_ms: 5_000 }),
            ))
            .unwrap();

        let err = billing
            .send_with(
                HttpRequest::post("/hang").body("INVOICE-4713"),
                RequestOptions::default().with_timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, MockError::TimedOut { .. }));
        assert!(message.contains("billing"), "{}", message);
        assert!(message.contains("INVOICE-4713"), "{}", message);
    }

    #[tokio::test]
    async fn test_verify_single_expectation() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        let ping = api
            .expect(
                Expectation::request(Method::Get, "/ping")
                    .respond_with(ResponseDefinition::new(204))
                    .times(Times::Exactly(1)),
            )
            .unwrap();
        let pending = api
            .expect(Expectation::request(Method::Post, "/pending").with_json_body(json!({"id": 9})))
            .unwrap();

        assert!(matches!(
            api.verify_expectation(&ping).unwrap_err(),
            MockError::Verification { calls: 0, .. }
        ));
        api.send(HttpRequest::get("/ping")).await.unwrap();
        api.verify_expectation(&ping).unwrap();

        let err = api.verify_expectation(&pending).unwrap_err();
        assert!(matches!(err, MockError::NotComplete { .. }));
        assert!(err.to_string().contains(r#"{"id":9}"#));
    }

    struct RecordingTransport {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send_with(
            &self,
            request: HttpRequest,
            _options: RequestOptions,
        ) -> MockResult<HttpResponse> {
            self.seen.lock().unwrap().push(request.uri);
            Ok(HttpResponse::new(204))
        }
    }

    #[tokio::test]
    async fn test_passthrough_bypasses_matching() {
        let registry = registry();
        let transport = Arc::new(RecordingTransport {
            seen: Mutex::new(Vec::new()),
        });
        let real = registry
            .create_passthrough_client("real", "https://real.example.com/v1/", transport.clone())
            .unwrap();
        assert!(real.is_passthrough());

        let response = real.send(HttpRequest::get("ping")).await.unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(
            *transport.seen.lock().unwrap(),
            vec!["https://real.example.com/v1/ping".to_string()]
        );
        registry.verify_all().unwrap();
    }

    #[tokio::test]
    async fn test_recreate_replaces_in_place() {
        let registry = registry();
        let first = registry.create_client("api", "https://api.example.com").unwrap();
        first
            .expect(Expectation::request(Method::Get, "/a").respond_with(ResponseDefinition::ok()))
            .unwrap();

        let second = registry.create_client("api", "https://other.example.com").unwrap();
        assert!(first.expectations().is_empty());
        assert_eq!(first.base_address().as_str(), "https://other.example.com/");
        assert_eq!(registry.client_names(), vec!["api".to_string()]);

        second
            .expect(Expectation::request(Method::Get, "/b").respond_with(ResponseDefinition::ok()))
            .unwrap();
        assert_eq!(first.send(HttpRequest::get("/b")).await.unwrap().status, 200);
        assert!(matches!(
            first.send(HttpRequest::get("/a")).await.unwrap_err(),
            MockError::NoMatch { .. }
        ));
    }

    #[tokio::test]
    async fn test_client_as_dyn_transport() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(
            Expectation::request(Method::Get, "/health")
                .respond_with(ResponseDefinition::text(200, "ok")),
        )
        .unwrap();

        let transport: Arc<dyn HttpTransport> = Arc::new(registry.client("api").unwrap());
        let response = transport.send(HttpRequest::get("/health")).await.unwrap();
        assert_eq!(response.text(), "ok");
    }

    #[test]
    fn test_unknown_client_and_reset() {
        let registry = registry();
        assert!(matches!(registry.client("nope"), Err(MockError::UnknownClient(_))));

        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(Expectation::request(Method::Get, "/a").respond_with(ResponseDefinition::ok()))
            .unwrap();
        registry.reset();
        tokio_test::assert_err!(registry.client("api"));
        assert!(api.expectations().is_empty());
        tokio_test::assert_ok!(registry.verify_all());
    }

    #[test]
    fn test_invalid_base_address() {
        let err = registry().create_client("bad", "not a url").unwrap_err();
        assert!(matches!(err, MockError::InvalidUri { .. }));
    }

    #[test]
    fn test_blocking_caller() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(
            Expectation::request(Method::Get, "/ping").respond_with(ResponseDefinition::new(204)),
        )
        .unwrap();

        let response = tokio_test::block_on(api.send(HttpRequest::get("/ping"))).unwrap();
        assert_eq!(response.status, 204);
    }

    #[test]
    fn test_incomplete_expectation_fails_client_verify() {
        let registry = registry();
        let api = registry.create_client("api", "https://api.example.com").unwrap();
        api.expect(Expectation::request(Method::Get, "/a").times(Times::Any)).unwrap();
        assert!(matches!(api.verify().unwrap_err(), MockError::NotComplete { .. }));
        registry.verify_all().unwrap();
    }

    #[tokio::test]
    async fn test_from_config() {
        let yaml = r#"
clients:
  - name: people
    base_address: https://people.example.com
    expectations:
      - name: create-bob
        request:
          method: POST
          uri:
            type: exact
            value: /person
          body:
            type: json
            content:
              firstName: Bob
        response:
          status: 201
          body:
            type: json
            content:
              id: 1
        times:
          type: exactly
          count: 1
  - name: status
    base_address: https://status.example.com
    expectations:
      - request:
          method: GET
          uri:
            type: prefix
            value: /health
        response:
          status: 200
settings:
  log_matches: false
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        let registry = MockClientRegistry::from_config(config).unwrap();
        assert_eq!(registry.client_names(), vec!["people".to_string(), "status".to_string()]);
        assert!(!registry.settings().log_matches);

        let people = registry.client("people").unwrap();
        let response = people
            .send(HttpRequest::post("/person").json(&json!({"firstName": "Bob"})))
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.content_type(), Some("application/json"));

        let report = registry.verification_report();
        assert_eq!(report.checked(), 2);
        assert_eq!(report.violations().len(), 1);
        assert_eq!(report.violations()[0].client, "status");
    }
}
