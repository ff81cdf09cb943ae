//! Contiguous per-element field storage.
//!
//! All fields of one representation live in a single allocation, with
//! per-field views handed out as slices. This is the arena form of the
//! usual "many fields, one buffer" layout: no per-field allocation, no
//! aliasing across ownership boundaries.
//!
//! Layout is field-major: field f occupies
//! `data[f * points_per_field .. (f + 1) * points_per_field]`.

use serde::{Deserialize, Serialize};

/// A set of field values on one grid (DG nodal or subcell averages).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    num_fields: usize,
    points_per_field: usize,
    data: Vec<f64>,
}

impl Variables {
    /// Allocate zero-initialized storage.
    pub fn new(num_fields: usize, points_per_field: usize) -> Self {
        Self {
            num_fields,
            points_per_field,
            data: vec![0.0; num_fields * points_per_field],
        }
    }

    /// Build from per-field slices (all must have the same length).
    pub fn from_fields(fields: &[&[f64]]) -> Self {
        assert!(!fields.is_empty(), "Need at least one field");
        let points = fields[0].len();
        let mut data = Vec::with_capacity(fields.len() * points);
        for field in fields {
            assert_eq!(field.len(), points, "All fields must share a grid");
            data.extend_from_slice(field);
        }
        Self {
            num_fields: fields.len(),
            points_per_field: points,
            data,
        }
    }

    /// Number of fields stored.
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// Grid points per field.
    #[inline]
    pub fn points_per_field(&self) -> usize {
        self.points_per_field
    }

    /// Immutable view of one field.
    #[inline]
    pub fn field(&self, f: usize) -> &[f64] {
        let start = f * self.points_per_field;
        &self.data[start..start + self.points_per_field]
    }

    /// Mutable view of one field.
    #[inline]
    pub fn field_mut(&mut self, f: usize) -> &mut [f64] {
        let start = f * self.points_per_field;
        &mut self.data[start..start + self.points_per_field]
    }

    /// Iterate over all field views.
    pub fn fields(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.num_fields).map(move |f| self.field(f))
    }

    /// Transform every field through a per-field map onto a new grid.
    ///
    /// Used for whole-variable projection/reconstruction.
    pub fn map_fields(&self, new_points: usize, mut op: impl FnMut(&[f64]) -> Vec<f64>) -> Self {
        let mut out = Self::new(self.num_fields, new_points);
        for f in 0..self.num_fields {
            let mapped = op(self.field(f));
            assert_eq!(mapped.len(), new_points);
            out.field_mut(f).copy_from_slice(&mapped);
        }
        out
    }

    /// True if every value in every field is finite.
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Index of the first field containing a non-finite value, if any.
    pub fn first_non_finite_field(&self) -> Option<usize> {
        (0..self.num_fields).find(|&f| self.field(f).iter().any(|v| !v.is_finite()))
    }
}
