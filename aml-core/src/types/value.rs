//! Tagged-sum value type for the free-form `context`/`metadata` maps that
//! patterns, solutions, and audit events carry.
//!
//! Rather than threading `serde_json::Value` everywhere (which admits
//! arbitrarily deep, unvalidated structures), we close the leaf set to a
//! small set of primitives and validate on ingest (see
//! [`crate::memory::validation`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A closed-world dynamic value: `null | bool | int | float | string | list
/// | map`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Signed integer leaf.
    Int(i64),
    /// Floating point leaf.
    Float(f64),
    /// UTF-8 string leaf.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map of values, ordered for deterministic serialization.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Shallow type name, used in validation error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// View as a string slice, if this is a `String` leaf.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// View as a map, if this is a `Map` leaf.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

/// A free-form context/metadata map, keyed by string.
pub type ValueMap = BTreeMap<String, Value>;

/// Fraction of keys in `candidate` that also appear in `reference`, used by
/// contextual-fit scoring and project-fit scoring.
#[must_use]
pub fn key_overlap_ratio(candidate: &ValueMap, reference: &ValueMap) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }
    let shared = candidate.keys().filter(|k| reference.contains_key(*k)).count();
    shared as f64 / candidate.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_ratio_of_disjoint_maps_is_zero() {
        let mut a = ValueMap::new();
        a.insert("framework".into(), Value::from("react"));
        let b = ValueMap::new();
        assert_eq!(key_overlap_ratio(&a, &b), 0.0);
    }

    #[test]
    fn overlap_ratio_of_identical_keys_is_one() {
        let mut a = ValueMap::new();
        a.insert("framework".into(), Value::from("react"));
        let mut b = ValueMap::new();
        b.insert("framework".into(), Value::from("vue"));
        assert_eq!(key_overlap_ratio(&a, &b), 1.0);
    }

    #[test]
    fn overlap_ratio_of_empty_candidate_is_zero() {
        let a = ValueMap::new();
        let mut b = ValueMap::new();
        b.insert("x".into(), Value::Null);
        assert_eq!(key_overlap_ratio(&a, &b), 0.0);
    }
}
