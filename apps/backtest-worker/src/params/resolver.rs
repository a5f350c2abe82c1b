//! Parameter resolution.
//!
//! Precedence, lowest to highest: strategy defaults → named preset →
//! explicit overrides. Unknown strategies, presets, and parameter names
//! fail fast; a typo is never silently accepted.

use std::collections::BTreeMap;

use thiserror::Error;

use super::schema::{ParamType, StrategySchema};
use super::{ParamValue, ParameterSet};
use crate::strategy::registry;

/// Parameter resolution failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The strategy key is not in the registry.
    #[error("unknown strategy '{key}'")]
    UnknownStrategy {
        /// The unrecognized strategy key.
        key: String,
    },

    /// The preset name is not defined for the strategy.
    #[error("unknown preset '{preset}' for strategy '{strategy}'")]
    UnknownPreset {
        /// The target strategy key.
        strategy: String,
        /// The unrecognized preset name.
        preset: String,
    },

    /// An override names a parameter the strategy does not accept.
    #[error("unknown parameter '{name}' for strategy '{strategy}'")]
    UnknownParameter {
        /// The target strategy key.
        strategy: String,
        /// The unrecognized parameter name.
        name: String,
    },

    /// An override value has the wrong type, cannot be coerced, or is out
    /// of the declared range.
    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// What was wrong with the value.
        reason: String,
    },
}

/// Resolve a validated parameter set for a strategy.
///
/// Merges strategy defaults, the named preset (if any), and explicit
/// overrides, then type- and range-checks every entry against the
/// strategy's schema.
///
/// # Errors
///
/// Returns [`ParamError`] for unknown strategies, presets, or parameter
/// names, and for values that cannot be coerced to the declared type or
/// fall outside the declared range.
pub fn resolve(
    strategy_key: &str,
    preset_name: Option<&str>,
    overrides: &BTreeMap<String, ParamValue>,
) -> Result<ParameterSet, ParamError> {
    let schema = registry::schema(strategy_key).ok_or_else(|| ParamError::UnknownStrategy {
        key: strategy_key.to_string(),
    })?;

    let mut values: BTreeMap<String, ParamValue> = schema
        .params
        .iter()
        .map(|spec| (spec.name.to_string(), spec.default.clone()))
        .collect();

    if let Some(name) = preset_name {
        let preset = schema
            .preset(name)
            .ok_or_else(|| ParamError::UnknownPreset {
                strategy: strategy_key.to_string(),
                preset: name.to_string(),
            })?;
        for (key, value) in &preset.overrides {
            values.insert((*key).to_string(), value.clone());
        }
    }

    for (key, value) in overrides {
        let checked = check(&schema, key, value)?;
        values.insert(key.clone(), checked);
    }

    Ok(ParameterSet::from_values(values))
}

/// Validate one override against the schema, coercing strings to the
/// declared numeric/bool type where possible.
fn check(
    schema: &StrategySchema,
    name: &str,
    value: &ParamValue,
) -> Result<ParamValue, ParamError> {
    let spec = schema.param(name).ok_or_else(|| ParamError::UnknownParameter {
        strategy: schema.key.to_string(),
        name: name.to_string(),
    })?;

    let typed = if spec.ty.accepts(value) {
        value.clone()
    } else if let ParamValue::String(raw) = value {
        coerce(spec.ty, raw).ok_or_else(|| ParamError::InvalidParameter {
            name: name.to_string(),
            reason: format!("cannot parse '{raw}' as {}", spec.ty.name()),
        })?
    } else {
        return Err(ParamError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected {}, got {value}", spec.ty.name()),
        });
    };

    if !spec.in_range(&typed) {
        let (min, max) = spec.range.unwrap_or((f64::MIN, f64::MAX));
        return Err(ParamError::InvalidParameter {
            name: name.to_string(),
            reason: format!("{typed} outside range [{min}, {max}]"),
        });
    }

    Ok(typed)
}

/// Coerce a raw string to the declared type.
fn coerce(ty: ParamType, raw: &str) -> Option<ParamValue> {
    match ty {
        ParamType::Int => raw.parse::<i64>().ok().map(ParamValue::Int),
        ParamType::Float => raw.parse::<f64>().ok().map(ParamValue::Float),
        ParamType::Bool => raw.parse::<bool>().ok().map(ParamValue::Bool),
        ParamType::Str => Some(ParamValue::String(raw.to_string())),
    }
}
