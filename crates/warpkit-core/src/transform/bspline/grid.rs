//! Control-point lattice geometry of a B-spline transform.

use crate::error::{Result, TransformError};
use crate::spatial::{Point, Spacing};

use crate::transform::trait_::check_length;

/// Index extent of a control-point grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRegion<const D: usize> {
    pub index: [i64; D],
    pub size: [usize; D],
}

/// Geometry of a control-point grid.
///
/// Node `k` (relative to the region start) lies at
/// `origin + (region.index + k) * spacing`. The lattice is axis aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BSplineGrid<const D: usize> {
    pub region: GridRegion<D>,
    pub origin: Point<D>,
    pub spacing: Spacing<D>,
}

impl<const D: usize> BSplineGrid<D> {
    /// Grid with region index zero.
    pub fn new(size: [usize; D], origin: Point<D>, spacing: Spacing<D>) -> Self {
        Self {
            region: GridRegion { index: [0; D], size },
            origin,
            spacing,
        }
    }

    /// One node per axis at the origin with unit spacing.
    ///
    /// No point has full cubic support on this grid, so a transform built on
    /// it is the identity.
    pub fn degenerate() -> Self {
        Self::new([1; D], Point::origin(), Spacing::uniform(1.0))
    }

    pub fn size(&self) -> [usize; D] {
        self.region.size
    }

    pub fn number_of_nodes(&self) -> usize {
        self.region.size.iter().product()
    }

    /// Flat-index strides, axis 0 fastest.
    pub fn strides(&self) -> [usize; D] {
        let mut strides = [1; D];
        for d in 1..D {
            strides[d] = strides[d - 1] * self.region.size[d - 1];
        }
        strides
    }

    /// Multi-index (relative to the region start) of a flat node index.
    pub fn node_index(&self, flat: usize) -> [usize; D] {
        let mut rest = flat;
        std::array::from_fn(|d| {
            let k = rest % self.region.size[d];
            rest /= self.region.size[d];
            k
        })
    }

    /// Physical position of a node given by its relative multi-index.
    pub fn node_position(&self, node: &[usize; D]) -> Point<D> {
        Point::from_fn(|d| self.origin[d] + (self.region.index[d] + node[d] as i64) as f64 * self.spacing[d])
    }

    /// Continuous index of a physical point relative to the region start.
    pub fn continuous_index(&self, point: &Point<D>) -> [f64; D] {
        std::array::from_fn(|d| (point[d] - self.origin[d]) / self.spacing[d] - self.region.index[d] as f64)
    }

    /// Size, index, spacing and origin, `D` values each.
    pub fn to_fixed_parameters(&self) -> Vec<f64> {
        let mut fixed = Vec::with_capacity(4 * D);
        fixed.extend(self.region.size.iter().map(|&s| s as f64));
        fixed.extend(self.region.index.iter().map(|&i| i as f64));
        fixed.extend(self.spacing.to_vec());
        fixed.extend(self.origin.to_vec());
        fixed
    }

    /// Inverse of [`BSplineGrid::to_fixed_parameters`].
    pub fn from_fixed_parameters(fixed: &[f64]) -> Result<Self> {
        check_length("set_fixed_parameters", 4 * D, fixed.len())?;
        let mut size = [0usize; D];
        let mut index = [0i64; D];
        for d in 0..D {
            let s = fixed[d];
            if !(s.is_finite() && s >= 1.0 && s.fract() == 0.0) {
                return Err(TransformError::invalid_configuration(format!(
                    "grid size along axis {d} must be a positive integer, got {s}"
                )));
            }
            let i = fixed[D + d];
            if !(i.is_finite() && i.fract() == 0.0) {
                return Err(TransformError::invalid_configuration(format!(
                    "grid index along axis {d} must be an integer, got {i}"
                )));
            }
            size[d] = s as usize;
            index[d] = i as i64;
        }
        let grid = Self {
            region: GridRegion { index, size },
            spacing: Spacing::from_fn(|d| fixed[2 * D + d]),
            origin: Point::from_fn(|d| fixed[3 * D + d]),
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Reject empty regions and non-positive spacing.
    pub fn validate(&self) -> Result<()> {
        if self.region.size.iter().any(|&s| s == 0) {
            return Err(TransformError::invalid_configuration(format!(
                "grid size must be at least 1 along every axis, got {:?}",
                self.region.size
            )));
        }
        if !self.spacing.is_positive() {
            return Err(TransformError::invalid_configuration(format!(
                "grid spacing must be positive, got {:?}",
                self.spacing.to_vec()
            )));
        }
        Ok(())
    }
}
