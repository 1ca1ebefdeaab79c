//! Condition operators and their typed comparisons
//!
//! Every operator is a pure `(expected, actual) -> bool` function. Operands
//! that cannot be coerced to the operator's type make the comparison false;
//! nothing here returns an error or panics.

use crate::error::AuthzError;
use crate::matcher::glob_match;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dashmap::DashMap;
use ipnet::IpNet;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::trace;

/// Condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    // String family
    StringEquals,
    StringNotEquals,
    StringLike,
    StringContains,
    StringStartsWith,
    StringEndsWith,
    StringIncludesAny,
    StringIncludesAll,
    StringRegex,

    // Numeric family
    NumericEquals,
    NumericNotEquals,
    NumericLessThan,
    NumericLessThanEquals,
    NumericGreaterThan,
    NumericGreaterThanEquals,

    // Boolean
    Bool,

    // Array family
    ArrayContains,
    ArrayContainsAny,
    ArrayNotContains,
    ArrayEquals,
    ArrayLengthEquals,
    ArrayLengthLessThan,
    ArrayLengthGreaterThan,

    // Date family
    DateEquals,
    DateNotEquals,
    DateLessThan,
    DateLessThanEquals,
    DateGreaterThan,
    DateGreaterThanEquals,
    DateInRange,

    // Network
    IpMatch,
    NotIpMatch,
    IpEquals,

    // Null check
    IsNull,
}

impl ConditionOperator {
    /// Every supported operator
    pub const ALL: [ConditionOperator; 34] = [
        Self::StringEquals,
        Self::StringNotEquals,
        Self::StringLike,
        Self::StringContains,
        Self::StringStartsWith,
        Self::StringEndsWith,
        Self::StringIncludesAny,
        Self::StringIncludesAll,
        Self::StringRegex,
        Self::NumericEquals,
        Self::NumericNotEquals,
        Self::NumericLessThan,
        Self::NumericLessThanEquals,
        Self::NumericGreaterThan,
        Self::NumericGreaterThanEquals,
        Self::Bool,
        Self::ArrayContains,
        Self::ArrayContainsAny,
        Self::ArrayNotContains,
        Self::ArrayEquals,
        Self::ArrayLengthEquals,
        Self::ArrayLengthLessThan,
        Self::ArrayLengthGreaterThan,
        Self::DateEquals,
        Self::DateNotEquals,
        Self::DateLessThan,
        Self::DateLessThanEquals,
        Self::DateGreaterThan,
        Self::DateGreaterThanEquals,
        Self::DateInRange,
        Self::IpMatch,
        Self::NotIpMatch,
        Self::IpEquals,
        Self::IsNull,
    ];

    /// Operator name as written in policy documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringEquals => "StringEquals",
            Self::StringNotEquals => "StringNotEquals",
            Self::StringLike => "StringLike",
            Self::StringContains => "StringContains",
            Self::StringStartsWith => "StringStartsWith",
            Self::StringEndsWith => "StringEndsWith",
            Self::StringIncludesAny => "StringIncludesAny",
            Self::StringIncludesAll => "StringIncludesAll",
            Self::StringRegex => "StringRegex",
            Self::NumericEquals => "NumericEquals",
            Self::NumericNotEquals => "NumericNotEquals",
            Self::NumericLessThan => "NumericLessThan",
            Self::NumericLessThanEquals => "NumericLessThanEquals",
            Self::NumericGreaterThan => "NumericGreaterThan",
            Self::NumericGreaterThanEquals => "NumericGreaterThanEquals",
            Self::Bool => "Bool",
            Self::ArrayContains => "ArrayContains",
            Self::ArrayContainsAny => "ArrayContainsAny",
            Self::ArrayNotContains => "ArrayNotContains",
            Self::ArrayEquals => "ArrayEquals",
            Self::ArrayLengthEquals => "ArrayLengthEquals",
            Self::ArrayLengthLessThan => "ArrayLengthLessThan",
            Self::ArrayLengthGreaterThan => "ArrayLengthGreaterThan",
            Self::DateEquals => "DateEquals",
            Self::DateNotEquals => "DateNotEquals",
            Self::DateLessThan => "DateLessThan",
            Self::DateLessThanEquals => "DateLessThanEquals",
            Self::DateGreaterThan => "DateGreaterThan",
            Self::DateGreaterThanEquals => "DateGreaterThanEquals",
            Self::DateInRange => "DateInRange",
            Self::IpMatch => "IpMatch",
            Self::NotIpMatch => "NotIpMatch",
            Self::IpEquals => "IpEquals",
            Self::IsNull => "IsNull",
        }
    }

    /// Compare a (resolved) expected value against the context value
    ///
    /// `actual` is `None` when the context path does not exist.
    pub fn evaluate(&self, expected: &Value, actual: Option<&Value>) -> bool {
        match self {
            Self::StringEquals => string_pair(expected, actual).is_some_and(|(e, a)| e == a),
            Self::StringNotEquals => string_pair(expected, actual).is_some_and(|(e, a)| e != a),
            Self::StringLike => string_pair(expected, actual).is_some_and(|(e, a)| glob_match(e, a)),
            Self::StringContains => string_pair(expected, actual).is_some_and(|(e, a)| a.contains(e)),
            Self::StringStartsWith => string_pair(expected, actual).is_some_and(|(e, a)| a.starts_with(e)),
            Self::StringEndsWith => string_pair(expected, actual).is_some_and(|(e, a)| a.ends_with(e)),
            Self::StringIncludesAny => includes(expected, actual, false),
            Self::StringIncludesAll => includes(expected, actual, true),
            Self::StringRegex => regex_match(expected, actual),

            Self::NumericEquals => numeric(expected, actual, |a, e| a == e),
            Self::NumericNotEquals => numeric(expected, actual, |a, e| a != e),
            Self::NumericLessThan => numeric(expected, actual, |a, e| a < e),
            Self::NumericLessThanEquals => numeric(expected, actual, |a, e| a <= e),
            Self::NumericGreaterThan => numeric(expected, actual, |a, e| a > e),
            Self::NumericGreaterThanEquals => numeric(expected, actual, |a, e| a >= e),

            Self::Bool => truthy(Some(expected)) == truthy(actual),

            Self::ArrayContains => array_contains(expected, actual, true),
            Self::ArrayContainsAny => array_contains(expected, actual, false),
            Self::ArrayNotContains => match actual.and_then(Value::as_array) {
                Some(items) => expected_items(expected).iter().all(|e| !items.contains(e)),
                None => false,
            },
            Self::ArrayEquals => match (expected.as_array(), actual.and_then(Value::as_array)) {
                (Some(e), Some(a)) => e == a,
                _ => false,
            },
            Self::ArrayLengthEquals => array_length(expected, actual, |len, n| len == n),
            Self::ArrayLengthLessThan => array_length(expected, actual, |len, n| len < n),
            Self::ArrayLengthGreaterThan => array_length(expected, actual, |len, n| len > n),

            Self::DateEquals => dates(expected, actual, |a, e| a == e),
            Self::DateNotEquals => dates(expected, actual, |a, e| a != e),
            Self::DateLessThan => dates(expected, actual, |a, e| a < e),
            Self::DateLessThanEquals => dates(expected, actual, |a, e| a <= e),
            Self::DateGreaterThan => dates(expected, actual, |a, e| a > e),
            Self::DateGreaterThanEquals => dates(expected, actual, |a, e| a >= e),
            Self::DateInRange => date_in_range(expected, actual),

            Self::IpMatch => ip_match(expected, actual),
            Self::NotIpMatch => not_ip_match(expected, actual),
            Self::IpEquals => match (expected.as_str().and_then(parse_ip), actual.and_then(Value::as_str).and_then(parse_ip)) {
                (Some(e), Some(a)) => e == a,
                _ => false,
            },

            Self::IsNull => match expected.as_bool() {
                Some(should_be_null) => actual.map_or(true, Value::is_null) == should_be_null,
                None => false,
            },
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = AuthzError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|op| op.as_str() == name)
            .copied()
            .ok_or_else(|| AuthzError::UnknownOperator(name.to_string()))
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn string_pair<'a>(expected: &'a Value, actual: Option<&'a Value>) -> Option<(&'a str, &'a str)> {
    Some((expected.as_str()?, actual?.as_str()?))
}

/// A scalar expected value behaves as a one-element list
fn expected_items(expected: &Value) -> &[Value] {
    match expected {
        Value::Array(items) => items.as_slice(),
        scalar => std::slice::from_ref(scalar),
    }
}

fn includes(expected: &Value, actual: Option<&Value>, require_all: bool) -> bool {
    let Some(actual) = actual.and_then(Value::as_str) else {
        return false;
    };
    let needles = expected_items(expected);
    if needles.is_empty() {
        return false;
    }

    let mut hits = needles
        .iter()
        .map(|needle| needle.as_str().is_some_and(|n| actual.contains(n)));
    if require_all {
        hits.all(|hit| hit)
    } else {
        hits.any(|hit| hit)
    }
}

/// Compiled patterns kept across evaluations; cleared when full
const REGEX_CACHE_CAPACITY: usize = 1024;

fn regex_cache() -> &'static DashMap<String, Regex> {
    static CACHE: OnceLock<DashMap<String, Regex>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Compile a pattern, or reuse the cached program
fn compiled_regex(pattern: &str) -> Option<Regex> {
    let cache = regex_cache();
    if let Some(re) = cache.get(pattern) {
        return Some(re.clone());
    }

    match Regex::new(pattern) {
        Ok(re) => {
            if cache.len() >= REGEX_CACHE_CAPACITY {
                cache.clear();
            }
            cache.insert(pattern.to_string(), re.clone());
            Some(re)
        }
        Err(e) => {
            trace!(pattern, error = %e, "invalid regex in condition, comparison fails");
            None
        }
    }
}

fn regex_match(expected: &Value, actual: Option<&Value>) -> bool {
    let Some((pattern, actual)) = string_pair(expected, actual) else {
        return false;
    };
    compiled_regex(pattern).is_some_and(|re| re.is_match(actual))
}

/// Numeric coercion: JSON numbers and numeric strings
fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (!n.is_nan()).then_some(n)
}

fn numeric(expected: &Value, actual: Option<&Value>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (to_number(expected), actual.and_then(to_number)) {
        (Some(e), Some(a)) => cmp(a, e),
        _ => false,
    }
}

/// Truthiness used by `Bool`
///
/// Missing and null are false. Strings are true unless empty, `"0"` or
/// `"false"` (any case), so JSON-authored `"false"` behaves as expected.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn array_contains(expected: &Value, actual: Option<&Value>, require_all: bool) -> bool {
    let Some(items) = actual.and_then(Value::as_array) else {
        return false;
    };
    let wanted = expected_items(expected);
    if wanted.is_empty() {
        return false;
    }
    if require_all {
        wanted.iter().all(|w| items.contains(w))
    } else {
        wanted.iter().any(|w| items.contains(w))
    }
}

fn array_length(expected: &Value, actual: Option<&Value>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(Value::as_array), to_number(expected)) {
        (Some(items), Some(n)) => cmp(items.len() as f64, n),
        _ => false,
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (UTC), `YYYY-MM-DD`
/// (midnight UTC) and epoch milliseconds
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn dates(
    expected: &Value,
    actual: Option<&Value>,
    cmp: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
) -> bool {
    match (parse_date(expected), actual.and_then(parse_date)) {
        (Some(e), Some(a)) => cmp(a, e),
        _ => false,
    }
}

fn date_in_range(expected: &Value, actual: Option<&Value>) -> bool {
    let Some([start, end]) = expected.as_array().map(Vec::as_slice) else {
        return false;
    };
    match (parse_date(start), parse_date(end), actual.and_then(parse_date)) {
        (Some(start), Some(end), Some(at)) => start <= at && at <= end,
        _ => false,
    }
}

fn parse_ip(s: &str) -> Option<IpAddr> {
    s.trim().parse().ok()
}

fn parse_cidr(s: &str) -> Option<IpNet> {
    s.trim().parse().ok()
}

/// Bare address: exact match; `ip/bits`: prefix match
fn ip_pattern_matches(pattern: &str, ip: &IpAddr) -> bool {
    if pattern.contains('/') {
        parse_cidr(pattern).is_some_and(|net| net.contains(ip))
    } else {
        parse_ip(pattern).is_some_and(|addr| addr == *ip)
    }
}

fn ip_match(expected: &Value, actual: Option<&Value>) -> bool {
    let Some(ip) = actual.and_then(Value::as_str).and_then(parse_ip) else {
        return false;
    };
    expected_items(expected)
        .iter()
        .any(|pattern| pattern.as_str().is_some_and(|p| ip_pattern_matches(p, &ip)))
}

/// CIDR ranges only; any bare address or malformed entry fails the comparison
fn not_ip_match(expected: &Value, actual: Option<&Value>) -> bool {
    let Some(ip) = actual.and_then(Value::as_str).and_then(parse_ip) else {
        return false;
    };
    let nets: Option<Vec<IpNet>> = expected_items(expected)
        .iter()
        .map(|pattern| pattern.as_str().filter(|p| p.contains('/')).and_then(parse_cidr))
        .collect();
    match nets {
        Some(nets) if !nets.is_empty() => nets.iter().all(|net| !net.contains(&ip)),
        _ => false,
    }
}
