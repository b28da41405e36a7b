//! Query string codec
//!
//! Query strings are `&`-separated `key=value` pairs, percent-decoded. A key
//! without `=` is the boolean `true`. Values are coerced the same way on
//! every parse: `true`/`false` become booleans, all-digit values become
//! numbers, everything else stays a string. Serialization percent-encodes
//! both key and value. Because of the coercion, a string that looks like a
//! boolean or a number does not survive [`encode_query`] then
//! [`parse_query`] as a string.

use std::borrow::Cow;

use crate::params::{ParamValue, Query};

/// Parses a query string (with or without the leading `?`)
///
/// When a key repeats, the first occurrence wins.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{parse_query, ParamValue};
///
/// let q = parse_query("?page=2&q=rust%20lang&debug");
/// assert_eq!(q.get("page"), Some(&ParamValue::Num(2)));
/// assert_eq!(q.get("q"), Some(&ParamValue::Str("rust lang".into())));
/// assert_eq!(q.get("debug"), Some(&ParamValue::Bool(true)));
/// ```
pub fn parse_query(search: &str) -> Query {
    let search = search.strip_prefix('?').unwrap_or(search);
    let mut query = Query::new();

    for pair in search.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), coerce_value(&decode_component(v))),
            None => (decode_component(pair), ParamValue::Bool(true)),
        };
        if key.is_empty() {
            continue;
        }
        query.entry(key.into_owned()).or_insert(value);
    }

    query
}

/// Serializes a query map, omitting the `?`
///
/// An empty map yields an empty string. [`parse_query`] reads back numbers,
/// booleans and ordinary strings unchanged, but a string value such as
/// `"true"` or `"007"` comes back coerced (`Bool(true)`, `Num(7)`).
///
/// ```
/// use rhtmx_navigator::{encode_query, params, ParamValue};
///
/// let q = params([("a", ParamValue::Num(1)), ("b", "x y".into())]);
/// assert_eq!(encode_query(&q), "a=1&b=x%20y");
/// ```
pub fn encode_query(query: &Query) -> String {
    query
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k),
                urlencoding::encode(&v.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Coerces a decoded raw value into a typed [`ParamValue`]
pub fn coerce_value(raw: &str) -> ParamValue {
    match raw {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        digits if is_digits(digits) => digits
            .parse::<u64>()
            .map(ParamValue::Num)
            .unwrap_or_else(|_| ParamValue::Str(digits.to_string())),
        other => ParamValue::Str(other.to_string()),
    }
}

/// `^\d+$`
pub(crate) fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn decode_component(raw: &str) -> Cow<'_, str> {
    let raw: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    let decoded = urlencoding::decode(&raw).map(Cow::into_owned);
    match decoded {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_round_trip_numbers_and_spaces() {
        let q = params([("a", ParamValue::Num(1)), ("b", "x y".into())]);
        assert_eq!(parse_query(&encode_query(&q)), q);
    }

    #[test]
    fn test_round_trip_booleans_and_reserved_chars() {
        let q = params([
            ("flag", ParamValue::Bool(false)),
            ("path", "/a&b=c?".into()),
            ("名", "値".into()),
        ]);
        assert_eq!(parse_query(&encode_query(&q)), q);
    }

    #[test]
    fn test_string_values_are_coerced_on_parse() {
        let q = params([("a", "true".into()), ("b", "007".into())]);
        let parsed = parse_query(&encode_query(&q));
        assert_eq!(
            parsed,
            params([("a", ParamValue::Bool(true)), ("b", ParamValue::Num(7))])
        );
    }

    #[test]
    fn test_empty() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("?").is_empty());
        assert_eq!(encode_query(&Query::new()), "");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let q = parse_query("a=1&a=2");
        assert_eq!(q.get("a"), Some(&ParamValue::Num(1)));
    }

    #[test]
    fn test_plus_is_space() {
        let q = parse_query("q=hello+world");
        assert_eq!(q.get("q"), Some(&ParamValue::Str("hello world".into())));
    }

    #[rstest]
    #[case("true", ParamValue::Bool(true))]
    #[case("false", ParamValue::Bool(false))]
    #[case("42", ParamValue::Num(42))]
    #[case("4x2", ParamValue::Str("4x2".into()))]
    #[case("", ParamValue::Str(String::new()))]
    #[case("99999999999999999999999", ParamValue::Str("99999999999999999999999".into()))]
    fn test_coerce_value(#[case] raw: &str, #[case] expected: ParamValue) {
        assert_eq!(coerce_value(raw), expected);
    }
}
