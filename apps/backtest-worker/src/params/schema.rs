//! Per-strategy parameter schemas.
//!
//! A schema declares, for one strategy, every accepted parameter with its
//! type, hard-coded default, optional numeric range, and optional default
//! sweep axis, plus the named presets tuned for that strategy.

use super::ParamValue;

/// Declared type of a strategy parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Integer parameter.
    Int,
    /// Decimal parameter.
    Float,
    /// Boolean parameter.
    Bool,
    /// String parameter.
    Str,
}

impl ParamType {
    /// Human-readable type name for error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "string",
        }
    }

    /// Check a value against this declared type. Integers are accepted
    /// where a float is declared.
    #[must_use]
    pub const fn accepts(self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (Self::Int, ParamValue::Int(_))
                | (Self::Float, ParamValue::Float(_) | ParamValue::Int(_))
                | (Self::Bool, ParamValue::Bool(_))
                | (Self::Str, ParamValue::String(_))
        )
    }
}

/// Specification of a single strategy parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Declared type.
    pub ty: ParamType,
    /// Hard-coded strategy default (lowest precedence).
    pub default: ParamValue,
    /// Inclusive numeric range, when the type is numeric.
    pub range: Option<(f64, f64)>,
    /// Default sweep axis values (empty = not swept by default).
    pub sweep: Vec<ParamValue>,
}

impl ParamSpec {
    /// Build a spec with no range and no sweep axis.
    #[must_use]
    pub const fn new(name: &'static str, ty: ParamType, default: ParamValue) -> Self {
        Self {
            name,
            ty,
            default,
            range: None,
            sweep: Vec::new(),
        }
    }

    /// Attach an inclusive numeric range.
    #[must_use]
    pub const fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Attach a default sweep axis.
    #[must_use]
    pub fn with_sweep(mut self, values: Vec<ParamValue>) -> Self {
        self.sweep = values;
        self
    }

    /// Check a typed value against the declared range, if any.
    #[must_use]
    pub fn in_range(&self, value: &ParamValue) -> bool {
        match (self.range, value.as_float()) {
            (Some((min, max)), Some(v)) => v >= min && v <= max,
            _ => true,
        }
    }
}

/// A named, pre-tuned parameter bundle.
#[derive(Debug, Clone)]
pub struct Preset {
    /// Preset name, e.g. `turtle_conservative`.
    pub name: &'static str,
    /// Parameter overrides applied on top of the strategy defaults.
    pub overrides: Vec<(&'static str, ParamValue)>,
}

/// Full parameter schema for one strategy.
#[derive(Debug, Clone)]
pub struct StrategySchema {
    /// Strategy key, e.g. `turtle`.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Accepted parameters.
    pub params: Vec<ParamSpec>,
    /// Named presets for this strategy.
    pub presets: Vec<Preset>,
}

impl StrategySchema {
    /// Look up a parameter spec by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }
}
