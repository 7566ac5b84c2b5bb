//! Request matching logic.
//!
//! Compiles a [`RequestDefinition`] against a client's base address and
//! evaluates intercepted calls against it.

use crate::compare::{
    ComparisonOptions, ComparisonResult, Difference, DifferenceKind, ValueComparator,
};
use crate::config::{BodyMatcher, HeaderMatcher, QueryMatcher, RequestDefinition, UriMatcher};
use crate::error::{MockError, MockResult};
use crate::http::Method;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// An intercepted call, with its URI already resolved against the base address.
#[derive(Debug, Clone, Copy)]
pub struct IncomingCall<'a> {
    pub method: Method,
    pub url: &'a Url,
    pub headers: &'a [(String, String)],
    pub body: Option<&'a [u8]>,
}

/// Why a JSON body did not satisfy its expectation.
#[derive(Debug, Clone)]
pub struct BodyMismatch {
    pub expected: String,
    pub actual: String,
    pub differences: ComparisonResult,
}

/// Result of evaluating one call against one matcher.
#[derive(Debug)]
pub enum MatchOutcome {
    Matched,
    /// Method, URI, query or headers did not match.
    Rejected,
    /// Everything but the JSON body matched.
    BodyMismatch(BodyMismatch),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

/// A compiled request matcher.
pub struct RequestMatcher {
    method: Method,
    uri: CompiledUriMatcher,
    query: Vec<(String, CompiledQueryMatcher)>,
    headers: Vec<(String, CompiledHeaderMatcher)>,
    body: CompiledBodyMatcher,
    description: String,
    body_description: String,
}

enum CompiledUriMatcher {
    Exact(NormalizedUri),
    Prefix(String),
    Template(PathTemplate),
    Regex(Regex),
    Glob(globset::GlobMatcher),
}

enum CompiledQueryMatcher {
    Exact(String),
    Regex(Regex),
    Present,
    Absent,
}

enum CompiledHeaderMatcher {
    Exact(String),
    Regex(Regex),
    Present,
    Absent,
    Contains(String),
}

enum CompiledBodyMatcher {
    Unconstrained,
    NonEmpty,
    Exact {
        content: Vec<u8>,
        content_type: Option<String>,
    },
    Json {
        expected: Value,
        comparator: ValueComparator,
    },
    Contains(String),
    Regex(Regex),
    JsonPath(HashMap<String, Value>),
}

/// URI reduced to the parts that take part in matching.
#[derive(Debug, PartialEq, Eq)]
struct NormalizedUri {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Vec<(String, String)>,
}

impl NormalizedUri {
    fn new(url: &Url) -> Self {
        let mut query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        query.sort();
        Self {
            scheme: url.scheme().to_string(),
            host: url.host_str().map(|h| h.to_lowercase()),
            port: url.port_or_known_default(),
            path: percent_decode(url.path()),
            query,
        }
    }
}

/// Path template such as `/users/{id}`; each `{..}` matches one non-empty run.
struct PathTemplate {
    segments: Vec<TemplateSegment>,
}

enum TemplateSegment {
    Literal(String),
    Param,
}

impl PathTemplate {
    fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_param = false;

        for ch in template.chars() {
            if ch == '{' && !in_param {
                if !current.is_empty() {
                    segments.push(TemplateSegment::Literal(std::mem::take(&mut current)));
                }
                in_param = true;
            } else if ch == '}' && in_param {
                segments.push(TemplateSegment::Param);
                in_param = false;
            } else if !in_param {
                current.push(ch);
            }
        }

        if !current.is_empty() {
            segments.push(TemplateSegment::Literal(current));
        }

        Self { segments }
    }

    fn matches(&self, path: &str) -> bool {
        let mut remaining = path;

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                TemplateSegment::Literal(lit) => match remaining.strip_prefix(lit.as_str()) {
                    Some(rest) => remaining = rest,
                    None => return false,
                },
                TemplateSegment::Param => {
                    // A parameter runs up to the following literal, or to the next slash
                    let end_pos = match self.segments.get(idx + 1) {
                        Some(TemplateSegment::Literal(next)) => {
                            match remaining.find(next.as_str()) {
                                Some(pos) => pos,
                                None => return false,
                            }
                        }
                        _ => remaining.find('/').unwrap_or(remaining.len()),
                    };
                    if end_pos == 0 {
                        return false;
                    }
                    remaining = &remaining[end_pos..];
                }
            }
        }

        // Must consume entire path
        remaining.is_empty()
    }
}

fn invalid(description: &str, reason: impl ToString) -> MockError {
    MockError::InvalidExpectation {
        expectation: description.to_string(),
        reason: reason.to_string(),
    }
}

impl RequestMatcher {
    /// Compile a request definition for a client rooted at `base`.
    ///
    /// `comparison` applies to JSON bodies that carry no options of their own.
    pub fn compile(
        definition: &RequestDefinition,
        base: &Url,
        comparison: &ComparisonOptions,
    ) -> MockResult<Self> {
        let origin = base.origin().ascii_serialization();
        let pattern_display = || format!("{}{}", origin, definition.uri);
        let (uri, uri_display) = match &definition.uri {
            UriMatcher::Exact { value } => {
                let url = base.join(value).map_err(|e| MockError::InvalidUri {
                    uri: value.clone(),
                    reason: e.to_string(),
                })?;
                let display = url.to_string();
                (CompiledUriMatcher::Exact(NormalizedUri::new(&url)), display)
            }
            UriMatcher::Prefix { value } => (
                CompiledUriMatcher::Prefix(percent_decode(value)),
                pattern_display(),
            ),
            UriMatcher::Template { template } => (
                CompiledUriMatcher::Template(PathTemplate::parse(template)),
                pattern_display(),
            ),
            UriMatcher::Regex { pattern } => {
                let display = pattern_display();
                let regex = Regex::new(pattern).map_err(|e| invalid(&display, e))?;
                (CompiledUriMatcher::Regex(regex), display)
            }
            UriMatcher::Glob { pattern } => {
                let display = pattern_display();
                let glob = globset::Glob::new(pattern).map_err(|e| invalid(&display, e))?;
                (CompiledUriMatcher::Glob(glob.compile_matcher()), display)
            }
        };
        let description = format!("{} {}", definition.method, uri_display);

        let mut query = Vec::with_capacity(definition.query.len());
        for (name, matcher) in &definition.query {
            let compiled = match matcher {
                QueryMatcher::Exact { value } => CompiledQueryMatcher::Exact(value.clone()),
                QueryMatcher::Regex { pattern } => CompiledQueryMatcher::Regex(
                    Regex::new(pattern).map_err(|e| invalid(&description, e))?,
                ),
                QueryMatcher::Present => CompiledQueryMatcher::Present,
                QueryMatcher::Absent => CompiledQueryMatcher::Absent,
            };
            query.push((name.clone(), compiled));
        }

        let mut headers = Vec::with_capacity(definition.headers.len());
        for (name, matcher) in &definition.headers {
            let compiled = match matcher {
                HeaderMatcher::Exact { value } => CompiledHeaderMatcher::Exact(value.clone()),
                HeaderMatcher::Regex { pattern } => CompiledHeaderMatcher::Regex(
                    Regex::new(pattern).map_err(|e| invalid(&description, e))?,
                ),
                HeaderMatcher::Present => CompiledHeaderMatcher::Present,
                HeaderMatcher::Absent => CompiledHeaderMatcher::Absent,
                HeaderMatcher::Contains { value } => CompiledHeaderMatcher::Contains(value.clone()),
            };
            headers.push((name.to_lowercase(), compiled));
        }

        let body = match &definition.body {
            BodyMatcher::None => CompiledBodyMatcher::Unconstrained,
            BodyMatcher::Any => CompiledBodyMatcher::NonEmpty,
            BodyMatcher::Exact {
                content,
                content_type,
            } => CompiledBodyMatcher::Exact {
                content: content.as_bytes().to_vec(),
                content_type: content_type.clone(),
            },
            BodyMatcher::Json { content, options } => CompiledBodyMatcher::Json {
                expected: content.clone(),
                comparator: ValueComparator::new(
                    options.clone().unwrap_or_else(|| comparison.clone()),
                ),
            },
            BodyMatcher::Contains { value } => CompiledBodyMatcher::Contains(value.clone()),
            BodyMatcher::Regex { pattern } => CompiledBodyMatcher::Regex(
                Regex::new(pattern).map_err(|e| invalid(&description, e))?,
            ),
            BodyMatcher::JsonPath { expressions } => {
                CompiledBodyMatcher::JsonPath(expressions.clone())
            }
        };

        Ok(Self {
            method: definition.method,
            uri,
            query,
            headers,
            body,
            description,
            body_description: definition.body.describe(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// `METHOD uri` as configured, for diagnostics.
    pub fn describe(&self) -> &str {
        &self.description
    }

    /// The configured body, for diagnostics.
    pub fn body_description(&self) -> &str {
        &self.body_description
    }

    /// Evaluate a call against this matcher.
    pub fn evaluate(&self, call: &IncomingCall<'_>) -> MatchOutcome {
        if call.method != self.method {
            return MatchOutcome::Rejected;
        }

        if !self.matches_uri(call.url) {
            return MatchOutcome::Rejected;
        }

        if !self.query.is_empty() {
            let params: HashMap<String, String> = call
                .url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            for (name, qm) in &self.query {
                if !matches_query(&params, name, qm) {
                    return MatchOutcome::Rejected;
                }
            }
        }

        for (name, hm) in &self.headers {
            if !matches_header(call.headers, name, hm) {
                return MatchOutcome::Rejected;
            }
        }

        self.matches_body(call)
    }

    fn matches_uri(&self, url: &Url) -> bool {
        match &self.uri {
            CompiledUriMatcher::Exact(expected) => *expected == NormalizedUri::new(url),
            CompiledUriMatcher::Prefix(prefix) => percent_decode(url.path()).starts_with(prefix),
            CompiledUriMatcher::Template(template) => {
                template.matches(&percent_decode(url.path()))
            }
            CompiledUriMatcher::Regex(regex) => regex.is_match(&percent_decode(url.path())),
            CompiledUriMatcher::Glob(glob) => glob.is_match(percent_decode(url.path())),
        }
    }

    fn matches_body(&self, call: &IncomingCall<'_>) -> MatchOutcome {
        let body = call.body.unwrap_or_default();
        let body_str = std::str::from_utf8(body).ok();

        let accepted = match &self.body {
            CompiledBodyMatcher::Unconstrained => true,
            CompiledBodyMatcher::NonEmpty => !body.is_empty(),
            CompiledBodyMatcher::Exact {
                content,
                content_type,
            } => {
                content.as_slice() == body
                    && content_type.as_ref().map_or(true, |expected| {
                        media_type(call.headers)
                            .is_some_and(|actual| actual.eq_ignore_ascii_case(expected))
                    })
            }
            CompiledBodyMatcher::Json {
                expected,
                comparator,
            } => return json_body(expected, comparator, body),
            CompiledBodyMatcher::Contains(value) => {
                body_str.is_some_and(|bs| bs.contains(value.as_str()))
            }
            CompiledBodyMatcher::Regex(regex) => body_str.is_some_and(|bs| regex.is_match(bs)),
            CompiledBodyMatcher::JsonPath(expressions) => body_str
                .and_then(|bs| serde_json::from_str::<Value>(bs).ok())
                .is_some_and(|json| matches_json_paths(&json, expressions)),
        };

        if accepted {
            MatchOutcome::Matched
        } else {
            MatchOutcome::Rejected
        }
    }
}

fn json_body(expected: &Value, comparator: &ValueComparator, body: &[u8]) -> MatchOutcome {
    let raw = String::from_utf8_lossy(body).into_owned();
    let differences = match serde_json::from_slice::<Value>(body) {
        Ok(actual) => comparator.compare(expected, &actual),
        Err(_) => ComparisonResult {
            differences: vec![Difference {
                path: "$".to_string(),
                kind: DifferenceKind::Type,
                expected: Some(expected.clone()),
                actual: Some(Value::String(raw.clone())),
            }],
            truncated: false,
        },
    };

    if differences.is_equal() {
        MatchOutcome::Matched
    } else {
        MatchOutcome::BodyMismatch(BodyMismatch {
            expected: expected.to_string(),
            actual: raw,
            differences,
        })
    }
}

/// Content type without parameters.
fn media_type(headers: &[(String, String)]) -> Option<&str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.split(';').next().unwrap_or_default().trim())
}

fn matches_query(
    query_params: &HashMap<String, String>,
    name: &str,
    matcher: &CompiledQueryMatcher,
) -> bool {
    match matcher {
        CompiledQueryMatcher::Exact(value) => query_params.get(name) == Some(value),
        CompiledQueryMatcher::Regex(regex) => {
            query_params.get(name).is_some_and(|v| regex.is_match(v))
        }
        CompiledQueryMatcher::Present => query_params.contains_key(name),
        CompiledQueryMatcher::Absent => !query_params.contains_key(name),
    }
}

fn matches_header(
    headers: &[(String, String)],
    name: &str,
    matcher: &CompiledHeaderMatcher,
) -> bool {
    // Names were lowercased at compile time
    let header_value = headers
        .iter()
        .find(|(k, _)| k.to_lowercase() == name)
        .map(|(_, v)| v);

    match matcher {
        CompiledHeaderMatcher::Exact(value) => header_value == Some(value),
        CompiledHeaderMatcher::Regex(regex) => header_value.is_some_and(|v| regex.is_match(v)),
        CompiledHeaderMatcher::Present => header_value.is_some(),
        CompiledHeaderMatcher::Absent => header_value.is_none(),
        CompiledHeaderMatcher::Contains(value) => {
            header_value.is_some_and(|v| v.contains(value.as_str()))
        }
    }
}

fn matches_json_paths(json: &Value, expressions: &HashMap<String, Value>) -> bool {
    use jsonpath_rust::JsonPath;

    for (path_expr, expected) in expressions {
        let path = match JsonPath::try_from(path_expr.as_str()) {
            Ok(p) => p,
            Err(_) => return false,
        };

        let results = path.find(json);

        // A null expectation only requires the path to resolve
        let matches = if expected.is_null() {
            !results.is_null()
        } else {
            results == *expected
        };
        if !matches {
            return false;
        }
    }
    true
}

/// Percent-decode a path so `%20` and a literal space compare equal.
fn percent_decode(s: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
