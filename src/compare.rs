//! Semantic comparison of structured values.
//!
//! Compares an expected JSON tree against an actual one and reports every
//! difference with a JSONPath-style location. Comparison is one-directional:
//! properties that only exist in the actual value are ignored, which makes
//! partial "contract" assertions possible.

use crate::error::{ParseError, Side};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// How leaf values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueComparison {
    /// Equivalent representations compare equal (dates, identifiers, numbers).
    #[default]
    Semantic,
    /// Raw text equality.
    Exact,
}

/// How an expected `null` is compared against a missing actual property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullComparison {
    /// Expected `null` is satisfied by an absent property.
    #[default]
    Semantic,
    /// Expected `null` requires an explicit `null`.
    Exact,
}

/// How expected property names are looked up in the actual object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameComparison {
    #[default]
    Ordinal,
    CaseInsensitive,
}

/// How differences inside arrays are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayComparison {
    /// One difference per differing index, plus one for a length mismatch.
    #[default]
    PerIndex,
    /// Any difference inside the array is reported once, as a replaced array.
    ReplaceWhole,
}

/// Options controlling a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonOptions {
    #[serde(default)]
    pub values: ValueComparison,

    #[serde(default)]
    pub nulls: NullComparison,

    #[serde(default)]
    pub property_names: NameComparison,

    #[serde(default)]
    pub arrays: ArrayComparison,

    /// Paths skipped during comparison, e.g. `$.id` or `$.items[*].createdAt`
    #[serde(default)]
    pub ignored_paths: Vec<String>,

    /// Stop after this many differences (0 = unlimited)
    #[serde(default = "default_max_differences")]
    pub max_differences: usize,
}

fn default_max_differences() -> usize {
    20
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            values: ValueComparison::default(),
            nulls: NullComparison::default(),
            property_names: NameComparison::default(),
            arrays: ArrayComparison::default(),
            ignored_paths: Vec::new(),
            max_differences: default_max_differences(),
        }
    }
}

impl ComparisonOptions {
    /// Raw equality for leaves and nulls.
    pub fn exact() -> Self {
        Self {
            values: ValueComparison::Exact,
            nulls: NullComparison::Exact,
            ..Self::default()
        }
    }

    pub fn with_values(mut self, mode: ValueComparison) -> Self {
        self.values = mode;
        self
    }

    pub fn with_nulls(mut self, mode: NullComparison) -> Self {
        self.nulls = mode;
        self
    }

    pub fn with_property_names(mut self, mode: NameComparison) -> Self {
        self.property_names = mode;
        self
    }

    pub fn with_arrays(mut self, mode: ArrayComparison) -> Self {
        self.arrays = mode;
        self
    }

    pub fn ignoring(mut self, path: impl Into<String>) -> Self {
        self.ignored_paths.push(path.into());
        self
    }

    pub fn with_max_differences(mut self, max: usize) -> Self {
        self.max_differences = max;
        self
    }

    /// Validate the ignored path expressions.
    pub fn validate(&self) -> anyhow::Result<()> {
        for path in &self.ignored_paths {
            parse_pattern(path)
                .map_err(|e| anyhow::anyhow!("Invalid ignored path `{}`: {}", path, e))?;
        }
        Ok(())
    }
}

/// Kind of a reported difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Same type, different value.
    Value,
    /// Different JSON types.
    Type,
    /// Expected property absent from the actual object.
    Missing,
    /// Arrays of different lengths.
    Length,
    /// Array reported as a whole.
    Replaced,
}

/// A single difference between expected and actual.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub path: String,
    pub kind: DifferenceKind,
    /// `None` when the value does not exist on that side.
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |v: &Option<Value>| match v {
            Some(v) => v.to_string(),
            None => "<missing>".to_string(),
        };
        match self.kind {
            DifferenceKind::Length => write!(
                f,
                "{}: expected array length {}, actual length {}",
                self.path,
                render(&self.expected),
                render(&self.actual)
            ),
            DifferenceKind::Replaced => write!(
                f,
                "{}: array replaced, expected {}, actual {}",
                self.path,
                render(&self.expected),
                render(&self.actual)
            ),
            _ => write!(
                f,
                "{}: expected {}, actual {}",
                self.path,
                render(&self.expected),
                render(&self.actual)
            ),
        }
    }
}

/// Outcome of a comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonResult {
    pub differences: Vec<Difference>,
    /// More differences existed than `max_differences` allowed.
    pub truncated: bool,
}

impl ComparisonResult {
    pub fn is_equal(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.differences.iter().map(|d| d.path.as_str()).collect()
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.differences.is_empty() {
            return f.write_str("no differences");
        }
        writeln!(f, "{} difference(s):", self.differences.len())?;
        for difference in &self.differences {
            writeln!(f, "  - {}", difference)?;
        }
        if self.truncated {
            writeln!(f, "  (further differences omitted)")?;
        }
        Ok(())
    }
}

/// Typed representations a string leaf is tried as, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringParser {
    DateTime,
    Identifier,
    Text,
}

impl StringParser {
    /// The first parser that accepts both sides decides equality.
    pub const ORDER: [StringParser; 3] = [
        StringParser::DateTime,
        StringParser::Identifier,
        StringParser::Text,
    ];

    fn parse(self, s: &str) -> Option<Leaf> {
        match self {
            StringParser::DateTime => parse_date_time(s),
            StringParser::Identifier => Uuid::parse_str(s).ok().map(Leaf::Identifier),
            StringParser::Text => Some(Leaf::Text(s.to_string())),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Leaf {
    Instant(DateTime<Utc>),
    Local(NaiveDateTime),
    Date(NaiveDate),
    Identifier(Uuid),
    Text(String),
}

fn parse_date_time(s: &str) -> Option<Leaf> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|d| Leaf::Instant(d.with_timezone(&Utc)))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(Leaf::Local))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(Leaf::Local))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Leaf::Date))
        .ok()
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn floats_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Key(String),
    Index(usize),
    AnyKey,
    AnyIndex,
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-')
}

fn render_path(segments: &[PathSegment]) -> String {
    let mut out = String::from("$");
    for segment in segments {
        match segment {
            PathSegment::Key(key) if is_identifier(key) => {
                out.push('.');
                out.push_str(key);
            }
            PathSegment::Key(key) => {
                out.push_str("['");
                out.push_str(&key.replace('\'', "\\'"));
                out.push_str("']");
            }
            PathSegment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Parse an ignore expression such as `$.a['b c'][*].d`.
fn parse_pattern(expr: &str) -> Result<Vec<PatternSegment>, String> {
    let chars: Vec<char> = expr.trim().chars().collect();
    let mut pos = 0;
    let mut segments = Vec::new();

    if chars.first() == Some(&'$') {
        pos = 1;
    } else if !chars.is_empty() && chars[0] != '.' && chars[0] != '[' {
        // Bare `a.b` is read as `$.a.b`
        let mut key = String::new();
        while pos < chars.len() && chars[pos] != '.' && chars[pos] != '[' {
            key.push(chars[pos]);
            pos += 1;
        }
        segments.push(if key == "*" {
            PatternSegment::AnyKey
        } else {
            PatternSegment::Key(key)
        });
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                pos += 1;
                let mut key = String::new();
                while pos < chars.len() && chars[pos] != '.' && chars[pos] != '[' {
                    key.push(chars[pos]);
                    pos += 1;
                }
                if key.is_empty() {
                    return Err(format!("empty property name at offset {}", pos));
                }
                segments.push(if key == "*" {
                    PatternSegment::AnyKey
                } else {
                    PatternSegment::Key(key)
                });
            }
            '[' => {
                pos += 1;
                match chars.get(pos) {
                    Some('*') => {
                        pos += 1;
                        segments.push(PatternSegment::AnyIndex);
                    }
                    Some(&quote) if quote == '\'' || quote == '"' => {
                        pos += 1;
                        let mut key = String::new();
                        loop {
                            match chars.get(pos) {
                                None => return Err("unterminated quoted name".to_string()),
                                Some('\\') if chars.get(pos + 1) == Some(&quote) => {
                                    key.push(quote);
                                    pos += 2;
                                }
                                Some(&c) if c == quote => {
                                    pos += 1;
                                    break;
                                }
                                Some(&c) => {
                                    key.push(c);
                                    pos += 1;
                                }
                            }
                        }
                        segments.push(PatternSegment::Key(key));
                    }
                    _ => {
                        let start = pos;
                        while pos < chars.len() && chars[pos].is_ascii_digit() {
                            pos += 1;
                        }
                        let digits: String = chars[start..pos].iter().collect();
                        let index = digits
                            .parse()
                            .map_err(|_| format!("invalid index at offset {}", start))?;
                        segments.push(PatternSegment::Index(index));
                    }
                }
                if chars.get(pos) != Some(&']') {
                    return Err(format!("expected `]` at offset {}", pos));
                }
                pos += 1;
            }
            other => return Err(format!("unexpected `{}` at offset {}", other, pos)),
        }
    }

    Ok(segments)
}

/// Pure, reusable comparator configured by [`ComparisonOptions`].
#[derive(Debug, Clone)]
pub struct ValueComparator {
    options: ComparisonOptions,
    ignored: Vec<Vec<PatternSegment>>,
}

impl Default for ValueComparator {
    fn default() -> Self {
        Self::new(ComparisonOptions::default())
    }
}

impl ValueComparator {
    pub fn new(options: ComparisonOptions) -> Self {
        let ignored = options
            .ignored_paths
            .iter()
            .filter_map(|path| match parse_pattern(path) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping invalid ignored path");
                    None
                }
            })
            .collect();
        Self { options, ignored }
    }

    pub fn options(&self) -> &ComparisonOptions {
        &self.options
    }

    /// Compare two value trees.
    pub fn compare(&self, expected: &Value, actual: &Value) -> ComparisonResult {
        let mut walk = Walk::new(self, Vec::new(), self.options.max_differences);
        let _ = walk.value(expected, Some(actual));
        walk.result
    }

    /// Parse both sides as JSON text, then compare.
    pub fn compare_str(
        &self,
        expected: &str,
        actual: &str,
    ) -> Result<ComparisonResult, ParseError> {
        self.compare_slices(expected.as_bytes(), actual.as_bytes())
    }

    pub fn compare_slices(
        &self,
        expected: &[u8],
        actual: &[u8],
    ) -> Result<ComparisonResult, ParseError> {
        let expected: Value =
            serde_json::from_slice(expected).map_err(|e| ParseError::new(Side::Expected, e))?;
        let actual: Value =
            serde_json::from_slice(actual).map_err(|e| ParseError::new(Side::Actual, e))?;
        Ok(self.compare(&expected, &actual))
    }

    /// Panic with a readable report unless `actual` satisfies `expected`.
    #[track_caller]
    pub fn assert_equivalent(&self, expected: &Value, actual: &Value) {
        let result = self.compare(expected, actual);
        if !result.is_equal() {
            panic!(
                "values are not equivalent\n  expected: {}\n  actual:   {}\n{}",
                expected, actual, result
            );
        }
    }

    fn lookup<'v>(&self, object: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
        match self.options.property_names {
            NameComparison::Ordinal => object.get(key),
            NameComparison::CaseInsensitive => object.get(key).or_else(|| {
                let key = key.to_lowercase();
                object
                    .iter()
                    .find(|(k, _)| k.to_lowercase() == key)
                    .map(|(_, v)| v)
            }),
        }
    }

    fn names_equal(&self, a: &str, b: &str) -> bool {
        match self.options.property_names {
            NameComparison::Ordinal => a == b,
            NameComparison::CaseInsensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }

    fn is_ignored(&self, path: &[PathSegment]) -> bool {
        self.ignored.iter().any(|pattern| {
            pattern.len() == path.len()
                && pattern.iter().zip(path).all(|(p, s)| match (p, s) {
                    (PatternSegment::Key(k), PathSegment::Key(name)) => self.names_equal(k, name),
                    (PatternSegment::AnyKey, PathSegment::Key(_)) => true,
                    (PatternSegment::Index(i), PathSegment::Index(j)) => i == j,
                    (PatternSegment::AnyIndex, PathSegment::Index(_)) => true,
                    _ => false,
                })
        })
    }

    fn numbers_equal(&self, expected: &Number, actual: &Number) -> bool {
        let (e, a) = (expected.to_string(), actual.to_string());
        if self.options.values == ValueComparison::Exact {
            return e == a;
        }
        if let (Some(x), Some(y)) = (parse_decimal(&e), parse_decimal(&a)) {
            return x == y;
        }
        match (expected.as_f64(), actual.as_f64()) {
            (Some(x), Some(y)) => floats_equal(x, y),
            _ => e == a,
        }
    }

    fn strings_equal(&self, expected: &str, actual: &str) -> bool {
        if self.options.values == ValueComparison::Exact {
            return expected == actual;
        }
        for parser in StringParser::ORDER {
            if let (Some(e), Some(a)) = (parser.parse(expected), parser.parse(actual)) {
                return e == a;
            }
        }
        expected == actual
    }
}

/// State of a single comparison walk.
struct Walk<'c> {
    comparator: &'c ValueComparator,
    path: Vec<PathSegment>,
    limit: usize,
    result: ComparisonResult,
}

impl<'c> Walk<'c> {
    fn new(comparator: &'c ValueComparator, path: Vec<PathSegment>, limit: usize) -> Self {
        Self {
            comparator,
            path,
            limit,
            result: ComparisonResult::default(),
        }
    }

    fn record(
        &mut self,
        kind: DifferenceKind,
        expected: Option<Value>,
        actual: Option<Value>,
    ) -> ControlFlow<()> {
        if self.limit > 0 && self.result.differences.len() >= self.limit {
            self.result.truncated = true;
            return ControlFlow::Break(());
        }
        self.result.differences.push(Difference {
            path: render_path(&self.path),
            kind,
            expected,
            actual,
        });
        ControlFlow::Continue(())
    }

    fn value(&mut self, expected: &Value, actual: Option<&Value>) -> ControlFlow<()> {
        if self.comparator.is_ignored(&self.path) {
            return ControlFlow::Continue(());
        }

        let Some(actual) = actual else {
            if expected.is_null() && self.comparator.options.nulls == NullComparison::Semantic {
                return ControlFlow::Continue(());
            }
            return self.record(DifferenceKind::Missing, Some(expected.clone()), None);
        };

        let equal = match (expected, actual) {
            (Value::Object(e), Value::Object(a)) => return self.object(e, a),
            (Value::Array(e), Value::Array(a)) => return self.array(e, a),
            (Value::Null, Value::Null) => true,
            (Value::Bool(e), Value::Bool(a)) => e == a,
            (Value::Number(e), Value::Number(a)) => self.comparator.numbers_equal(e, a),
            (Value::String(e), Value::String(a)) => self.comparator.strings_equal(e, a),
            _ => {
                return self.record(
                    DifferenceKind::Type,
                    Some(expected.clone()),
                    Some(actual.clone()),
                )
            }
        };

        if equal {
            ControlFlow::Continue(())
        } else {
            self.record(
                DifferenceKind::Value,
                Some(expected.clone()),
                Some(actual.clone()),
            )
        }
    }

    fn object(
        &mut self,
        expected: &Map<String, Value>,
        actual: &Map<String, Value>,
    ) -> ControlFlow<()> {
        for (key, value) in expected {
            self.path.push(PathSegment::Key(key.clone()));
            let found = self.comparator.lookup(actual, key);
            self.value(value, found)?;
            self.path.pop();
        }
        ControlFlow::Continue(())
    }

    fn array(&mut self, expected: &[Value], actual: &[Value]) -> ControlFlow<()> {
        match self.comparator.options.arrays {
            ArrayComparison::PerIndex => self.elements(expected, actual),
            ArrayComparison::ReplaceWhole => {
                let mut trial = Walk::new(self.comparator, self.path.clone(), 1);
                let _ = trial.elements(expected, actual);
                if trial.result.is_equal() {
                    ControlFlow::Continue(())
                } else {
                    self.record(
                        DifferenceKind::Replaced,
                        Some(Value::Array(expected.to_vec())),
                        Some(Value::Array(actual.to_vec())),
                    )
                }
            }
        }
    }

    fn elements(&mut self, expected: &[Value], actual: &[Value]) -> ControlFlow<()> {
        for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
            self.path.push(PathSegment::Index(i));
            self.value(e, Some(a))?;
            self.path.pop();
        }
        if expected.len() != actual.len() {
            return self.record(
                DifferenceKind::Length,
                Some(Value::from(expected.len())),
                Some(Value::from(actual.len())),
            );
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compare(expected: &str, actual: &str, options: ComparisonOptions) -> ComparisonResult {
        ValueComparator::new(options)
            .compare_str(expected, actual)
            .unwrap()
    }

    #[test]
    fn test_key_order_and_whitespace_ignored() {
        let result = compare(
            r#"{"a": 1, "b": {"c": [1, 2], "d": "x"}}"#,
            r#"{ "b" : { "d":"x",
                 "c":[1,2] },"a":1 }"#,
            ComparisonOptions::default(),
        );
        assert!(result.is_equal(), "{}", result);
    }

    #[test]
    fn test_null_matches_missing_property_semantically() {
        let result = compare(r#"{"a":1,"b":null}"#, r#"{"a":1}"#, ComparisonOptions::default());
        assert!(result.is_equal());

        let exact_nulls = ComparisonOptions::default().with_nulls(NullComparison::Exact);
        let result = compare(r#"{"a":1,"b":null}"#, r#"{"a":1}"#, exact_nulls);
        assert_eq!(result.len(), 1);
        assert_eq!(result.differences[0].path, "$.b");
        assert_eq!(result.differences[0].kind, DifferenceKind::Missing);
        assert_eq!(result.differences[0].actual, None);
    }

    #[test]
    fn test_null_against_value_is_type_mismatch() {
        let result = compare(r#"{"b":null}"#, r#"{"b":0}"#, ComparisonOptions::default());
        assert_eq!(result.differences[0].kind, DifferenceKind::Type);
    }

    #[test]
    fn test_extra_actual_properties_ignored() {
        let result = compare(
            r#"{"name":"Bob"}"#,
            r#"{"name":"Bob","age":42,"tags":[]}"#,
            ComparisonOptions::default(),
        );
        assert!(result.is_equal());
    }

    #[test]
    fn test_missing_expected_property() {
        let result = compare(r#"{"name":"Bob"}"#, r#"{}"#, ComparisonOptions::default());
        assert_eq!(result.paths(), vec!["$.name"]);
        assert_eq!(result.differences[0].kind, DifferenceKind::Missing);
    }

    #[test]
    fn test_type_mismatch() {
        let result = compare(r#"{"n":"1"}"#, r#"{"n":1}"#, ComparisonOptions::default());
        assert_eq!(result.differences[0].kind, DifferenceKind::Type);
    }

    #[test]
    fn test_array_per_index_differences() {
        let result = compare(
            r#"{"items":[1,2,3]}"#,
            r#"{"items":[1,5,3,4]}"#,
            ComparisonOptions::default(),
        );
        assert_eq!(result.paths(), vec!["$.items[1]", "$.items"]);
        assert_eq!(result.differences[1].kind, DifferenceKind::Length);
        assert_eq!(result.differences[1].expected, Some(json!(3)));
        assert_eq!(result.differences[1].actual, Some(json!(4)));
    }

    #[test]
    fn test_array_replace_whole_opt_in() {
        let options = ComparisonOptions::default().with_arrays(ArrayComparison::ReplaceWhole);
        let result = compare(r#"{"items":[1,2,3]}"#, r#"{"items":[9,9,9]}"#, options.clone());
        assert_eq!(result.len(), 1);
        assert_eq!(result.differences[0].kind, DifferenceKind::Replaced);
        assert_eq!(result.differences[0].path, "$.items");

        let result = compare(r#"{"items":[1,2]}"#, r#"{"items":[1,2]}"#, options);
        assert!(result.is_equal());
    }

    #[test]
    fn test_ignored_paths() {
        let options = ComparisonOptions::default()
            .ignoring("$.id")
            .ignoring("$.items[*].createdAt");
        let result = compare(
            r#"{"id":1,"items":[{"name":"a","createdAt":"x"},{"name":"b","createdAt":"y"}]}"#,
            r#"{"id":2,"items":[{"name":"a","createdAt":"z"},{"name":"b","createdAt":"w"}]}"#,
            options,
        );
        assert!(result.is_equal(), "{}", result);
    }

    #[test]
    fn test_ignored_quoted_key() {
        let options = ComparisonOptions::default().ignoring("$['odd key']");
        let result = compare(r#"{"odd key":1}"#, r#"{"odd key":2}"#, options);
        assert!(result.is_equal());

        let result = compare(r#"{"odd key":1}"#, r#"{"odd key":2}"#, ComparisonOptions::default());
        assert_eq!(result.paths(), vec!["$['odd key']"]);
    }

    #[test]
    fn test_max_differences_truncates() {
        let options = ComparisonOptions::default().with_max_differences(2);
        let result = compare(r#"[1,2,3,4]"#, r#"[5,6,7,8]"#, options.clone());
        assert_eq!(result.len(), 2);
        assert!(result.truncated);

        let result = compare(r#"[1,2]"#, r#"[5,6]"#, options);
        assert_eq!(result.len(), 2);
        assert!(!result.truncated);
    }

    #[test]
    fn test_semantic_date_times() {
        let result = compare(
            r#"{"at":"2024-01-01T10:00:00Z"}"#,
            r#"{"at":"2024-01-01T12:00:00+02:00"}"#,
            ComparisonOptions::default(),
        );
        assert!(result.is_equal());

        let result = compare(
            r#"{"at":"2024-01-01T10:00:00Z"}"#,
            r#"{"at":"2024-01-01T12:00:00+02:00"}"#,
            ComparisonOptions::exact(),
        );
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_semantic_identifiers() {
        let result = compare(
            r#""A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11""#,
            r#""a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11""#,
            ComparisonOptions::default(),
        );
        assert!(result.is_equal());
    }

    #[test]
    fn test_semantic_numbers() {
        assert!(compare("1.0", "1", ComparisonOptions::default()).is_equal());
        assert!(compare("1e2", "100", ComparisonOptions::default()).is_equal());
        assert!(compare("0.30", "0.3", ComparisonOptions::default()).is_equal());
        assert!(!compare("1.5", "1", ComparisonOptions::default()).is_equal());
        assert!(!compare("1.0", "1", ComparisonOptions::exact()).is_equal());
    }

    #[test]
    fn test_case_insensitive_property_names() {
        let options =
            ComparisonOptions::default().with_property_names(NameComparison::CaseInsensitive);
        let result = compare(r#"{"FirstName":"Bob"}"#, r#"{"firstName":"Bob"}"#, options);
        assert!(result.is_equal());

        let result = compare(
            r#"{"FirstName":"Bob"}"#,
            r#"{"firstName":"Bob"}"#,
            ComparisonOptions::default(),
        );
        assert!(!result.is_equal());
    }

    #[test]
    fn test_parse_error_names_side() {
        let comparator = ValueComparator::default();
        let err = comparator.compare_str("{", "{}").unwrap_err();
        assert_eq!(err.side, Side::Expected);

        let err = comparator.compare_str("{}", "nope").unwrap_err();
        assert_eq!(err.side, Side::Actual);
    }

    #[test]
    fn test_options_validation() {
        assert!(ComparisonOptions::default().ignoring("$.a[*].b").validate().is_ok());
        assert!(ComparisonOptions::default().ignoring("$.a[").validate().is_err());
    }

    #[test]
    fn test_difference_report() {
        let result = compare(r#"{"a":1}"#, r#"{"a":2}"#, ComparisonOptions::default());
        assert_eq!(result.to_string(), "1 difference(s):\n  - $.a: expected 1, actual 2\n");
    }

    #[test]
    #[should_panic(expected = "values are not equivalent")]
    fn test_assert_equivalent_panics() {
        ValueComparator::default().assert_equivalent(&json!({"a": 1}), &json!({"a": 2}));
    }
}
