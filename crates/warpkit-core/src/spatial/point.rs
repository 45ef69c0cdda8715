//! Point type for representing physical coordinates.

use nalgebra::Point as NaPoint;
use serde::{Deserialize, Serialize};

use super::Vector;

/// A point in D-dimensional physical space.
///
/// Thin wrapper around nalgebra's `Point` so the transform code can add
/// domain helpers (dimension reduction for stacked transforms, slice
/// conversion) without losing nalgebra arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// The point with all coordinates zero.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Build a point coordinate by coordinate.
    pub fn from_fn(mut f: impl FnMut(usize) -> f64) -> Self {
        let mut point = Self::origin();
        for i in 0..D {
            point.0.coords[i] = f(i);
        }
        point
    }

    /// Create a point from a slice; `None` when the length is not `D`.
    pub fn from_slice(coords: &[f64]) -> Option<Self> {
        (coords.len() == D).then(|| Self::from_fn(|i| coords[i]))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.coords.iter().copied().collect()
    }

    /// Drop the trailing coordinate, yielding a point of dimension `R`.
    ///
    /// `R` must be `D - 1`; extra coordinates are ignored otherwise.
    pub fn truncate<const R: usize>(&self) -> Point<R> {
        Point::<R>::from_fn(|i| self[i])
    }

    /// Append `last` to a point of dimension `R`, yielding dimension `D`.
    pub fn extend<const R: usize>(reduced: &Point<R>, last: f64) -> Self {
        Self::from_fn(|i| if i < R { reduced[i] } else { last })
    }

    /// Get the inner nalgebra point.
    pub fn inner(&self) -> &NaPoint<f64, D> {
        &self.0
    }

    /// Get a mutable reference to the inner nalgebra point.
    pub fn inner_mut(&mut self) -> &mut NaPoint<f64, D> {
        &mut self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}
