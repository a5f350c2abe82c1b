//! Cartesian parameter grid.
//!
//! Axes are ordered; enumeration varies the first axis slowest and the
//! last fastest, so a combination's index is stable for a given grid.
//! Rankings use that index as the deterministic tie-breaker.

use std::collections::BTreeMap;

use crate::params::ParamValue;

/// One enumerated combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRun {
    /// Stable enumeration index within the grid.
    pub index: u64,
    /// Parameter overrides for this combination.
    pub overrides: BTreeMap<String, ParamValue>,
}

/// Ordered set of sweep axes.
#[derive(Debug, Clone, Default)]
pub struct ParameterGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterGrid {
    /// Empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from ordered axes.
    #[must_use]
    pub fn from_axes(axes: Vec<(String, Vec<ParamValue>)>) -> Self {
        Self { axes }
    }

    /// Append an axis. Empty value lists are ignored.
    #[must_use]
    pub fn with_axis(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        if !values.is_empty() {
            self.axes.push((name.into(), values));
        }
        self
    }

    /// Axis names in order.
    #[must_use]
    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of combinations the grid enumerates.
    #[must_use]
    pub fn total_combinations(&self) -> u64 {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes
            .iter()
            .map(|(_, values)| values.len() as u64)
            .product()
    }

    /// Enumerate every combination with its stable index.
    #[must_use]
    pub fn combinations(&self) -> Vec<SweepRun> {
        if self.axes.is_empty() {
            return Vec::new();
        }

        let seed = vec![BTreeMap::new()];
        let combos = self.axes.iter().fold(seed, |acc, (name, values)| {
            let mut next = Vec::with_capacity(acc.len() * values.len());
            for base in &acc {
                for value in values {
                    let mut combo = base.clone();
                    combo.insert(name.clone(), value.clone());
                    next.push(combo);
                }
            }
            next
        });

        combos
            .into_iter()
            .enumerate()
            .map(|(index, overrides)| SweepRun {
                index: index as u64,
                overrides,
            })
            .collect()
    }
}
