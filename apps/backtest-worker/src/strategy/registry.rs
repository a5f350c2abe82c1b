//! Strategy schema registry.
//!
//! Schemas are built on demand; they are small and the lookup is off the
//! hot path. The registry is the single source of truth for defaults,
//! ranges, presets, and default sweep axes.

use crate::params::{ParamSpec, ParamType, ParamValue, Preset, StrategySchema};

/// Keys of every registered strategy.
#[must_use]
pub fn strategy_keys() -> Vec<&'static str> {
    vec!["turtle", "grid"]
}

/// Look up the schema for a strategy key.
#[must_use]
pub fn schema(key: &str) -> Option<StrategySchema> {
    match key {
        "turtle" => Some(turtle_schema()),
        "grid" => Some(grid_schema()),
        _ => None,
    }
}

/// Default sweep axes for a strategy: every parameter that declares a
/// sweep axis, in schema order.
#[must_use]
pub fn default_axes(key: &str) -> Option<Vec<(String, Vec<ParamValue>)>> {
    let schema = schema(key)?;
    Some(
        schema
            .params
            .iter()
            .filter(|spec| !spec.sweep.is_empty())
            .map(|spec| (spec.name.to_string(), spec.sweep.clone()))
            .collect(),
    )
}

fn turtle_schema() -> StrategySchema {
    StrategySchema {
        key: "turtle",
        name: "Turtle breakout",
        params: vec![
            ParamSpec::new("entry_window", ParamType::Int, ParamValue::Int(20))
                .with_range(2.0, 400.0)
                .with_sweep(vec![ParamValue::Int(20), ParamValue::Int(55)]),
            ParamSpec::new("exit_window", ParamType::Int, ParamValue::Int(10))
                .with_range(2.0, 400.0)
                .with_sweep(vec![ParamValue::Int(10), ParamValue::Int(20)]),
            ParamSpec::new("atr_window", ParamType::Int, ParamValue::Int(20))
                .with_range(2.0, 400.0),
            ParamSpec::new("risk_pct", ParamType::Float, ParamValue::Float(0.02))
                .with_range(0.001, 0.2)
                .with_sweep(vec![
                    ParamValue::Float(0.01),
                    ParamValue::Float(0.02),
                    ParamValue::Float(0.03),
                ]),
            ParamSpec::new("max_units", ParamType::Int, ParamValue::Int(4))
                .with_range(1.0, 10.0)
                .with_sweep(vec![ParamValue::Int(2), ParamValue::Int(4)]),
            ParamSpec::new("trailing_stop_mult", ParamType::Float, ParamValue::Float(2.0))
                .with_range(0.5, 10.0),
            ParamSpec::new(
                "exit_mode",
                ParamType::Str,
                ParamValue::String("trailing".to_string()),
            ),
        ],
        presets: vec![
            Preset {
                name: "turtle_standard",
                overrides: vec![],
            },
            Preset {
                name: "turtle_conservative",
                overrides: vec![
                    ("entry_window", ParamValue::Int(55)),
                    ("exit_window", ParamValue::Int(20)),
                    ("risk_pct", ParamValue::Float(0.01)),
                    ("max_units", ParamValue::Int(2)),
                ],
            },
            Preset {
                name: "turtle_aggressive",
                overrides: vec![
                    ("risk_pct", ParamValue::Float(0.03)),
                    ("max_units", ParamValue::Int(6)),
                ],
            },
        ],
    }
}

fn grid_schema() -> StrategySchema {
    StrategySchema {
        key: "grid",
        name: "Grid ladder",
        params: vec![
            ParamSpec::new("grid_pct", ParamType::Float, ParamValue::Float(0.03))
                .with_range(0.005, 0.2)
                .with_sweep(vec![
                    ParamValue::Float(0.02),
                    ParamValue::Float(0.03),
                    ParamValue::Float(0.04),
                    ParamValue::Float(0.05),
                ]),
            ParamSpec::new("max_batches", ParamType::Int, ParamValue::Int(5))
                .with_range(1.0, 20.0)
                .with_sweep(vec![
                    ParamValue::Int(3),
                    ParamValue::Int(5),
                    ParamValue::Int(7),
                ]),
        ],
        presets: vec![Preset {
            name: "grid_default",
            overrides: vec![],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_resolves_to_a_schema() {
        for key in strategy_keys() {
            let schema = schema(key).unwrap();
            assert_eq!(schema.key, key);
            assert!(!schema.params.is_empty());
        }
    }

    #[test]
    fn unknown_key_has_no_schema() {
        assert!(schema("single_yang").is_none());
    }

    #[test]
    fn preset_overrides_name_real_parameters() {
        for key in strategy_keys() {
            let schema = schema(key).unwrap();
            for preset in &schema.presets {
                for (name, value) in &preset.overrides {
                    let spec = schema.param(name).unwrap();
                    assert!(spec.ty.accepts(value), "{key}/{}/{name}", preset.name);
                    assert!(spec.in_range(value), "{key}/{}/{name}", preset.name);
                }
            }
        }
    }

    #[test]
    fn sweep_axes_stay_in_range() {
        for key in strategy_keys() {
            let schema = schema(key).unwrap();
            for spec in &schema.params {
                for value in &spec.sweep {
                    assert!(spec.ty.accepts(value), "{key}/{}", spec.name);
                    assert!(spec.in_range(value), "{key}/{}", spec.name);
                }
            }
        }
    }

    #[test]
    fn turtle_default_axes_cover_four_parameters() {
        let axes = default_axes("turtle").unwrap();
        let names: Vec<&str> = axes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["entry_window", "exit_window", "risk_pct", "max_units"]);
    }

    #[test]
    fn grid_default_axes_enumerate_twelve_combinations() {
        let axes = default_axes("grid").unwrap();
        let total: usize = axes.iter().map(|(_, values)| values.len()).product();
        assert_eq!(total, 12);
    }
}
