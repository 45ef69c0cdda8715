//! Persisted state of a B-spline transform.
//!
//! Grid geometry and coefficients together reconstruct the deformation
//! exactly; the text format they are written in is up to the caller.

use serde::{Deserialize, Serialize};
use warpkit_core::spatial::{Point, Spacing};
use warpkit_core::transform::{BSplineGrid, BSplineTransform, GridRegion};
use warpkit_core::TransformError;

use crate::error::Result;

/// Named fixed parameters plus the flat coefficient vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineTransformParameters {
    pub grid_size: Vec<usize>,
    pub grid_index: Vec<i64>,
    pub grid_spacing: Vec<f64>,
    pub grid_origin: Vec<f64>,
    /// Dimension-major coefficients.
    pub transform_parameters: Vec<f64>,
}

impl BSplineTransformParameters {
    pub fn from_transform<const D: usize>(transform: &BSplineTransform<D>) -> Self {
        let grid = transform.grid();
        Self {
            grid_size: grid.region.size.to_vec(),
            grid_index: grid.region.index.to_vec(),
            grid_spacing: grid.spacing.to_vec(),
            grid_origin: grid.origin.to_vec(),
            transform_parameters: transform.coefficients().to_vec(),
        }
    }

    /// Rebuild the transform, checking every length against `D`.
    pub fn into_transform<const D: usize>(&self) -> Result<BSplineTransform<D>> {
        let axis_count = |name: &'static str, len: usize| -> Result<()> {
            if len == D {
                Ok(())
            } else {
                Err(TransformError::mismatch(name, D, len).into())
            }
        };
        axis_count("grid_size", self.grid_size.len())?;
        axis_count("grid_index", self.grid_index.len())?;
        axis_count("grid_spacing", self.grid_spacing.len())?;
        axis_count("grid_origin", self.grid_origin.len())?;

        let grid = BSplineGrid {
            region: GridRegion {
                index: std::array::from_fn(|d| self.grid_index[d]),
                size: std::array::from_fn(|d| self.grid_size[d]),
            },
            origin: Point::from_fn(|d| self.grid_origin[d]),
            spacing: Spacing::from_fn(|d| self.grid_spacing[d]),
        };
        Ok(BSplineTransform::with_parameters(grid, self.transform_parameters.clone())?)
    }
}
