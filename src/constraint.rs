//! Weight constraints, applied to a parameter after every optimiser step.

use crate::error::{Error, Result};

pub trait Constraint: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Projects `weights` back into the feasible set, in place.
    fn apply(&self, weights: &mut [f32]);

    fn config(&self) -> Vec<(&'static str, f32)> {
        Vec::new()
    }
}

/// Clips every value into `[min_value, max_value]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxConstraint {
    min_value: f32,
    max_value: f32,
}

impl Default for MinMaxConstraint {
    fn default() -> Self {
        Self { min_value: 0.0, max_value: 9.0 }
    }
}

impl MinMaxConstraint {
    pub fn new(min_value: f32, max_value: f32) -> Result<Self> {
        if min_value.is_nan() || max_value.is_nan() || min_value > max_value {
            return Err(Error::InvalidBounds { min: min_value, max: max_value });
        }

        Ok(Self { min_value, max_value })
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }
}

impl Constraint for MinMaxConstraint {
    fn name(&self) -> &'static str {
        "min_max"
    }

    fn apply(&self, weights: &mut [f32]) {
        for w in weights {
            *w = w.clamp(self.min_value, self.max_value);
        }
    }

    fn config(&self) -> Vec<(&'static str, f32)> {
        vec![("min_value", self.min_value), ("max_value", self.max_value)]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NonNeg;

impl Constraint for NonNeg {
    fn name(&self) -> &'static str {
        "non_neg"
    }

    fn apply(&self, weights: &mut [f32]) {
        for w in weights {
            *w = w.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds() {
        let constraint = MinMaxConstraint::default();
        assert_eq!(constraint.config(), vec![("min_value", 0.0), ("max_value", 9.0)]);

        let mut weights = [-0.5, 0.0, 3.0, 9.0, 9.5, 100.0];
        constraint.apply(&mut weights);
        assert_eq!(weights, [0.0, 0.0, 3.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn custom_bounds() {
        let constraint = MinMaxConstraint::new(-1.0, 1.0).unwrap();
        let mut weights = [-2.0, -0.25, 0.75, 1.5];
        constraint.apply(&mut weights);
        assert_eq!(weights, [-1.0, -0.25, 0.75, 1.0]);
    }

    #[test]
    fn in_range_values_are_untouched() {
        let constraint = MinMaxConstraint::new(0.0, 9.0).unwrap();
        let original = [0.1, 4.2, 8.999];
        let mut weights = original;
        constraint.apply(&mut weights);
        assert_eq!(weights, original);
    }

    #[test]
    fn degenerate_interval() {
        let constraint = MinMaxConstraint::new(2.0, 2.0).unwrap();
        let mut weights = [-1.0, 2.0, 5.0];
        constraint.apply(&mut weights);
        assert_eq!(weights, [2.0; 3]);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(matches!(MinMaxConstraint::new(9.0, 0.0), Err(Error::InvalidBounds { .. })));
        assert!(MinMaxConstraint::new(f32::NAN, 1.0).is_err());
    }

    #[test]
    fn non_neg() {
        let mut weights = [-1.0, 0.0, 2.0];
        NonNeg.apply(&mut weights);
        assert_eq!(weights, [0.0, 0.0, 2.0]);
    }
}
