//! Relaxed discrete maximum principle (RDMP) data and check.
//!
//! The RDMP indicator compares the extrema of the monitored fields
//! against a relaxed envelope of the extrema seen in the two most recent
//! steps. The envelope is widened by
//!
//! delta = max(delta0, epsilon * (max - min))
//!
//! so that both an absolute floor and a relative tolerance apply. The
//! history is a two-deep ring (current step and previous step), never an
//! unbounded accumulation, and travels with the element during load
//! balancing; it cannot be rebuilt from current fields alone.

use serde::{Deserialize, Serialize};

/// Min/max envelope of one field over some set of points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldBounds {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
}

impl FieldBounds {
    /// The empty envelope: folding anything into it replaces it.
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Extrema of a slice of values.
    ///
    /// NaN entries propagate into the bounds (min/max of NaN is NaN via
    /// explicit comparison below), which downstream checks treat as a
    /// violation.
    pub fn from_slice(values: &[f64]) -> Self {
        let mut bounds = Self::empty();
        for &v in values {
            if v.is_nan() {
                return Self {
                    min: f64::NAN,
                    max: f64::NAN,
                };
            }
            if v < bounds.min {
                bounds.min = v;
            }
            if v > bounds.max {
                bounds.max = v;
            }
        }
        bounds
    }

    /// Union of two envelopes. NaN in either operand poisons the result
    /// (f64::min/max would silently drop it).
    pub fn union(self, other: Self) -> Self {
        if self.min.is_nan() || self.max.is_nan() || other.min.is_nan() || other.max.is_nan() {
            return Self {
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// True if both ends are finite.
    pub fn is_finite(self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Rolling two-deep min/max history for the monitored fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RdmpTciData {
    current: Vec<FieldBounds>,
    previous: Vec<FieldBounds>,
}

impl RdmpTciData {
    /// Seed the history from the initial field extrema. Both ring slots
    /// start at the same bounds.
    pub fn new(initial: Vec<FieldBounds>) -> Self {
        Self {
            previous: initial.clone(),
            current: initial,
        }
    }

    /// Number of monitored fields.
    pub fn num_fields(&self) -> usize {
        self.current.len()
    }

    /// Fold newly observed extrema into the ring: the old current step
    /// becomes the previous one, older history is discarded.
    pub fn update(&mut self, observed: Vec<FieldBounds>) {
        assert_eq!(observed.len(), self.current.len());
        self.previous = std::mem::replace(&mut self.current, observed);
    }

    /// The effective envelope per field: union of the two stored steps.
    pub fn bounds(&self) -> Vec<FieldBounds> {
        self.current
            .iter()
            .zip(&self.previous)
            .map(|(c, p)| c.union(*p))
            .collect()
    }

    /// Check candidate extrema against the relaxed envelope.
    ///
    /// Returns `true` (pass) iff every candidate lies within
    /// `[min - delta, max + delta]` of the effective envelope. Does not
    /// mutate state. Non-finite candidates always fail.
    pub fn check(&self, candidate: &[FieldBounds], delta0: f64, epsilon: f64) -> bool {
        assert_eq!(candidate.len(), self.current.len());

        for (cand, env) in candidate.iter().zip(self.bounds()) {
            if !cand.is_finite() {
                return false;
            }
            let delta = delta0.max(epsilon * (env.max - env.min));
            if cand.min < env.min - delta || cand.max > env.max + delta {
                return false;
            }
        }
        true
    }
}
