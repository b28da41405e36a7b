//! Captured parameter and query values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single path parameter or query value
///
/// Numeric path segments (`:id<num>`) capture [`ParamValue::Num`], named
/// segments capture [`ParamValue::Str`]. Query values may additionally be
/// [`ParamValue::Bool`] (`?flag` or `?flag=true`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Num(u64),
    Str(String),
}

impl ParamValue {
    /// Returns the string payload, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a number
    pub fn as_num(&self) -> Option<u64> {
        match self {
            ParamValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Num(n) => write!(f, "{}", n),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::Num(n)
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Num(u64::from(n))
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// Ordered parameter map (ordered so that match results compare and print
/// deterministically)
pub type Params = BTreeMap<String, ParamValue>;

/// Ordered query map
pub type Query = BTreeMap<String, ParamValue>;

/// Builds a [`Params`] map from `(key, value)` pairs
///
/// ```
/// use rhtmx_navigator::{params, ParamValue};
///
/// let p = params([("id", ParamValue::Num(42)), ("tab", "info".into())]);
/// assert_eq!(p.get("id"), Some(&ParamValue::Num(42)));
/// ```
pub fn params<I, K>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, ParamValue)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
