//! Configuration values for simulated clients.
//!
//! Defines expectations, canned responses, simulation settings and
//! registry-wide defaults. Everything here is plain data: it can be built in
//! code (see [`crate::expectation`]) or loaded from a YAML file.

use crate::compare::ComparisonOptions;
use crate::http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Simulated clients and their expectations
    #[serde(default)]
    pub clients: Vec<ClientDefinition>,

    /// Registry-wide settings
    #[serde(default)]
    pub settings: RegistrySettings,
}

impl MockConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.settings.comparison.validate()?;
        let mut seen = std::collections::HashSet::new();
        for client in &self.clients {
            if !seen.insert(client.name.as_str()) {
                anyhow::bail!("Client `{}` is defined more than once", client.name);
            }
            client
                .validate()
                .map_err(|e| anyhow::anyhow!("Client `{}`: {}", client.name, e))?;
        }
        Ok(())
    }

    /// Total number of expectations across all clients.
    pub fn expectation_count(&self) -> usize {
        self.clients.iter().map(|c| c.expectations.len()).sum()
    }
}

/// A named simulated client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientDefinition {
    pub name: String,

    /// Base address relative URIs are resolved against
    pub base_address: String,

    /// Send calls to the real network instead of matching them
    #[serde(default)]
    pub passthrough: bool,

    #[serde(default)]
    pub expectations: Vec<ExpectationDefinition>,
}

impl ClientDefinition {
    /// Validate the client definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Client name cannot be empty");
        }
        url::Url::parse(&self.base_address)
            .map_err(|e| anyhow::anyhow!("Invalid base address `{}`: {}", self.base_address, e))?;
        for (i, expectation) in self.expectations.iter().enumerate() {
            expectation
                .validate()
                .map_err(|e| anyhow::anyhow!("Expectation {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// A single expected call with its canned responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationDefinition {
    /// Optional name used in diagnostics
    #[serde(default)]
    pub name: Option<String>,

    /// Request matcher
    pub request: RequestDefinition,

    /// Response served for every matched call
    #[serde(default)]
    pub response: Option<ResponseDefinition>,

    /// Responses served once each, in order
    #[serde(default)]
    pub sequence: Vec<ResponseDefinition>,

    /// Call-count policy
    #[serde(default)]
    pub times: Times,
}

impl ExpectationDefinition {
    /// Validate the expectation definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.request.validate()?;
        if self.response.is_some() && !self.sequence.is_empty() {
            anyhow::bail!("Use either `response` or `sequence`, not both");
        }
        if let Some(response) = &self.response {
            response.validate()?;
        }
        for (i, response) in self.sequence.iter().enumerate() {
            response
                .validate()
                .map_err(|e| anyhow::anyhow!("Sequence entry {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Whether any response was configured.
    pub fn is_complete(&self) -> bool {
        self.response.is_some() || !self.sequence.is_empty()
    }
}

/// Request matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestDefinition {
    /// HTTP method to match
    pub method: Method,

    /// URI matching
    pub uri: UriMatcher,

    /// Query parameter matching
    #[serde(default)]
    pub query: HashMap<String, QueryMatcher>,

    /// Header matching
    #[serde(default)]
    pub headers: HashMap<String, HeaderMatcher>,

    /// Body matching
    #[serde(default)]
    pub body: BodyMatcher,
}

impl RequestDefinition {
    /// Validate the request matcher.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.uri.validate()?;
        for (name, matcher) in &self.query {
            if let QueryMatcher::Regex { pattern } = matcher {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("Invalid regex for query `{}`: {}", name, e))?;
            }
        }
        for (name, matcher) in &self.headers {
            if let HeaderMatcher::Regex { pattern } = matcher {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("Invalid regex for header `{}`: {}", name, e))?;
            }
        }
        self.body.validate()
    }
}

/// URI matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UriMatcher {
    /// Exact URI (absolute, or relative to the base address), query included
    Exact { value: String },
    /// Path prefix match
    Prefix { value: String },
    /// Path with parameters (e.g., /users/{id})
    Template { template: String },
    /// Regex pattern match on the path
    Regex { pattern: String },
    /// Glob pattern match on the path
    Glob { pattern: String },
}

impl UriMatcher {
    /// Validate the URI matcher.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            UriMatcher::Regex { pattern } => {
                regex::Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid regex: {}", e))?;
            }
            UriMatcher::Glob { pattern } => {
                globset::Glob::new(pattern).map_err(|e| anyhow::anyhow!("Invalid glob: {}", e))?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for UriMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriMatcher::Exact { value } => f.write_str(value),
            UriMatcher::Prefix { value } => write!(f, "{}*", value),
            UriMatcher::Template { template } => f.write_str(template),
            UriMatcher::Regex { pattern } => write!(f, "~{}", pattern),
            UriMatcher::Glob { pattern } => f.write_str(pattern),
        }
    }
}

/// Query parameter matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryMatcher {
    /// Exact value match
    Exact { value: String },
    /// Regex pattern match
    Regex { pattern: String },
    /// Parameter must be present (any value)
    Present,
    /// Parameter must be absent
    Absent,
}

/// Header matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeaderMatcher {
    /// Exact value match
    Exact { value: String },
    /// Regex pattern match
    Regex { pattern: String },
    /// Header must be present (any value)
    Present,
    /// Header must be absent
    Absent,
    /// Value must contain substring
    Contains { value: String },
}

/// Body matching configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyMatcher {
    /// No constraint: calls with or without a body are accepted
    #[default]
    None,
    /// A non-empty body must be present
    Any,
    /// Byte-for-byte body match, optionally with a content type
    Exact {
        content: String,
        #[serde(default)]
        content_type: Option<String>,
    },
    /// Semantic JSON comparison
    Json {
        content: serde_json::Value,
        /// Falls back to the registry's comparison options
        #[serde(default)]
        options: Option<ComparisonOptions>,
    },
    /// Body must contain substring
    Contains { value: String },
    /// Regex pattern match
    Regex { pattern: String },
    /// JSON path matching
    JsonPath {
        /// JSON path expressions and expected values
        expressions: HashMap<String, serde_json::Value>,
    },
}

impl BodyMatcher {
    /// Validate the body matcher.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            BodyMatcher::Regex { pattern } => {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("Invalid body regex: {}", e))?;
            }
            BodyMatcher::Json {
                options: Some(options),
                ..
            } => options.validate()?,
            _ => {}
        }
        Ok(())
    }

    /// Configured body rendered for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            BodyMatcher::None => "<any>".to_string(),
            BodyMatcher::Any => "<non-empty>".to_string(),
            BodyMatcher::Exact { content, .. } => content.clone(),
            BodyMatcher::Json { content, .. } => content.to_string(),
            BodyMatcher::Contains { value } => format!("<containing {:?}>", value),
            BodyMatcher::Regex { pattern } => format!("<matching /{}/>", pattern),
            BodyMatcher::JsonPath { expressions } => {
                let mut paths: Vec<_> = expressions
                    .iter()
                    .map(|(path, value)| format!("{} = {}", path, value))
                    .collect();
                paths.sort();
                format!("<{}>", paths.join(", "))
            }
        }
    }
}

/// Response definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseDefinition {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body
    #[serde(default)]
    pub body: Option<ResponseBody>,

    /// Latency simulation
    #[serde(default)]
    pub delay: Option<DelayConfig>,

    /// Fail at the transport level instead of returning a status
    #[serde(default)]
    pub fault: Option<TransportFault>,
}

fn default_status() -> u16 {
    200
}

impl ResponseDefinition {
    /// Empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
            delay: None,
            fault: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn json(status: u16, content: serde_json::Value) -> Self {
        Self::new(status).with_body(ResponseBody::Json { content })
    }

    pub fn text(status: u16, content: impl Into<String>) -> Self {
        Self::new(status).with_body(ResponseBody::Text {
            content: content.into(),
        })
    }

    /// A connection-level failure instead of a response.
    pub fn failure(fault: TransportFault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new(0)
        }
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(DelayConfig {
            fixed_ms: delay.as_millis() as u64,
            min_ms: 0,
            max_ms: 0,
        });
        self
    }

    /// Delay sampled uniformly from `[min, max]` on every delivery.
    pub fn with_random_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay = Some(DelayConfig {
            fixed_ms: 0,
            min_ms: min.as_millis() as u64,
            max_ms: max.as_millis() as u64,
        });
        self
    }

    /// Validate the response definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fault.is_none() && (self.status < 100 || self.status > 599) {
            anyhow::bail!("Invalid status code: {}", self.status);
        }
        if let Some(delay) = &self.delay {
            delay.validate()?;
        }
        Ok(())
    }
}

/// Response body configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Plain text body
    Text { content: String },
    /// JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
    /// Load from file
    File { path: String },
}

impl ResponseBody {
    /// Get the body content as bytes.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            ResponseBody::Text { content } => Ok(content.as_bytes().to_vec()),
            ResponseBody::Json { content } => Ok(serde_json::to_vec(content)?),
            ResponseBody::Base64 { content } => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e))
            }
            ResponseBody::File { path } => std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path, e)),
        }
    }

    /// Get content type for this body.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            ResponseBody::Text { .. } => Some("text/plain"),
            ResponseBody::Json { .. } => Some("application/json"),
            ResponseBody::Base64 { .. } => Some("application/octet-stream"),
            ResponseBody::File { .. } => None,
        }
    }
}

/// Delay/latency simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    /// Fixed delay in milliseconds
    #[serde(default)]
    pub fixed_ms: u64,

    /// Minimum delay for random range (ms)
    #[serde(default)]
    pub min_ms: u64,

    /// Maximum delay for random range (ms)
    #[serde(default)]
    pub max_ms: u64,
}

impl DelayConfig {
    /// Calculate the actual delay to apply.
    pub fn calculate(&self) -> Duration {
        if self.fixed_ms > 0 {
            return Duration::from_millis(self.fixed_ms);
        }
        if self.max_ms > self.min_ms {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            return Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms));
        }
        Duration::from_millis(self.min_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fixed_ms == 0 && self.max_ms > 0 && self.max_ms < self.min_ms {
            anyhow::bail!(
                "Delay range is inverted: min_ms {} > max_ms {}",
                self.min_ms,
                self.max_ms
            );
        }
        Ok(())
    }
}

/// Simulated connection-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportFault {
    ConnectionRefused,
    ConnectionReset,
    /// Hang for the duration, then fail as timed out
    Timeout { duration_ms: u64 },
    Other { message: String },
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFault::ConnectionRefused => f.write_str("connection refused (simulated)"),
            TransportFault::ConnectionReset => f.write_str("connection reset by peer (simulated)"),
            TransportFault::Timeout { duration_ms } => {
                write!(f, "no response within {}ms (simulated)", duration_ms)
            }
            TransportFault::Other { message } => write!(f, "{} (simulated)", message),
        }
    }
}

/// Call-count policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "count", rename_all = "snake_case")]
pub enum Times {
    /// Never verified, unlimited capacity
    Any,
    #[default]
    AtLeastOnce,
    Exactly(u32),
    AtMost(u32),
    Never,
}

impl Times {
    /// Upper bound on matched calls, if any.
    pub fn capacity(&self) -> Option<u32> {
        match self {
            Times::Any | Times::AtLeastOnce => None,
            Times::Exactly(n) | Times::AtMost(n) => Some(*n),
            Times::Never => Some(0),
        }
    }

    /// Whether another call fits under the upper bound.
    pub fn has_capacity(&self, calls: u32) -> bool {
        self.capacity().map_or(true, |max| calls < max)
    }

    pub fn is_satisfied(&self, calls: u32) -> bool {
        match self {
            Times::Any => true,
            Times::AtLeastOnce => calls >= 1,
            Times::Exactly(n) => calls == *n,
            Times::AtMost(n) => calls <= *n,
            Times::Never => calls == 0,
        }
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Times::Any => f.write_str("any number of times"),
            Times::AtLeastOnce => f.write_str("at least once"),
            Times::Exactly(n) => write!(f, "exactly {} time(s)", n),
            Times::AtMost(n) => write!(f, "at most {} time(s)", n),
            Times::Never => f.write_str("never"),
        }
    }
}

/// Registry-wide settings, fixed for the lifetime of a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySettings {
    /// Log all matched calls
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched calls
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Content type for bodies that do not imply one
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// Comparison options for JSON bodies that do not carry their own
    #[serde(default)]
    pub comparison: ComparisonOptions,

    /// Longest body rendered in error messages (0 = unlimited)
    #[serde(default = "default_body_print_limit")]
    pub body_print_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_body_print_limit() -> usize {
    10_000
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            default_content_type: default_content_type(),
            comparison: ComparisonOptions::default(),
            body_print_limit: default_body_print_limit(),
        }
    }
}

impl RegistrySettings {
    /// Render a body for diagnostics, truncated to the print limit.
    pub fn render_body(&self, body: &str) -> String {
        if body.is_empty() {
            return "<empty>".to_string();
        }
        if self.body_print_limit == 0 || body.chars().count() <= self.body_print_limit {
            return body.to_string();
        }
        let shown: String = body.chars().take(self.body_print_limit).collect();
        format!("{}... (truncated)", shown)
    }
}
