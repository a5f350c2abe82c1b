//! Typed strategy parameters.
//!
//! Strategy parameters arrive as loosely-shaped JSON (task payloads) or as
//! `key=value` strings. They are validated exactly once, against the target
//! strategy's schema, and frozen into a [`ParameterSet`] before any
//! execution or network call. Nothing past the resolver touches raw input.

mod resolver;
mod schema;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use resolver::{ParamError, resolve};
pub use schema::{ParamSpec, ParamType, Preset, StrategySchema};

/// Parameter value that can be numeric, boolean, or string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter.
    Int(i64),
    /// Decimal parameter.
    Float(f64),
    /// Boolean parameter.
    Bool(bool),
    /// String parameter.
    String(String),
}

impl ParamValue {
    /// Get as integer if applicable.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as float if applicable (integers widen).
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as boolean if applicable.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Render the value for display and wire keys.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::String(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// A fully resolved, immutable strategy parameter set.
///
/// Built only by [`resolve`]; every key the target strategy requires is
/// present and type/range-valid by construction. Iteration order is the
/// key order (`BTreeMap`), so serialized forms are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub(crate) fn from_values(values: BTreeMap<String, ParamValue>) -> Self {
        Self { values }
    }

    /// Look up a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Look up an integer parameter.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(ParamValue::as_int)
    }

    /// Look up a float parameter (integers widen).
    #[must_use]
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(ParamValue::as_float)
    }

    /// Iterate over the resolved key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Number of resolved parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
