//! Derivation of the control-point grid from the fixed image.

use tracing::debug;
use warpkit_core::spatial::{Point, Spacing};
use warpkit_core::transform::{AdvancedTransform, BSplineGrid};
use warpkit_core::ImageGeometry;

use crate::error::{RegistrationError, Result};

/// Tolerance applied before rounding the node count up, so an extent that is
/// an exact multiple of the grid spacing does not gain a node from rounding
/// noise.
const COVERAGE_TOLERANCE: f64 = 1e-6;

/// Control-point grid covering `geometry` at `spacing_factor` times the image
/// spacing.
///
/// The nodes covering the image are centred on its physical extent, with one
/// extra node before and two after so every image point has full cubic
/// support. When the direction is not the identity, or an initial transform
/// is given, the extent is the axis-aligned bounding box of the image corners
/// (mapped through the initial transform).
///
/// The result depends only on the arguments.
pub fn define_grid<const D: usize>(
    geometry: &ImageGeometry<D>,
    spacing_factor: &[f64; D],
    initial_transform: Option<&dyn AdvancedTransform<D>>,
) -> Result<BSplineGrid<D>> {
    let size = geometry.size();
    if size.iter().any(|&s| s == 0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "fixed image size must be non-zero along every axis, got {size:?}"
        )));
    }
    if !geometry.spacing().is_positive() || spacing_factor.iter().any(|f| !(f.is_finite() && *f > 0.0)) {
        return Err(RegistrationError::invalid_configuration(format!(
            "image spacing {:?} and spacing factor {spacing_factor:?} must be positive",
            geometry.spacing().to_vec()
        )));
    }

    let grid_spacing = geometry.spacing().component_mul(&Spacing::new(*spacing_factor));

    let (start, extent) = if geometry.direction().is_identity() && initial_transform.is_none() {
        let extent: [f64; D] = std::array::from_fn(|d| (size[d] - 1) as f64 * geometry.spacing()[d]);
        (*geometry.origin(), extent)
    } else {
        bounding_box(geometry, initial_transform)?
    };

    let mut grid_size = [0usize; D];
    let origin = Point::<D>::from_fn(|d| {
        let covering = (extent[d] / grid_spacing[d] - COVERAGE_TOLERANCE).ceil().max(0.0) as usize + 1;
        // An extent inside the tolerance past the covering nodes puts all of
        // its overshoot after the last node, where the margin has room for it.
        let shift = (((covering - 1) as f64 * grid_spacing[d] - extent[d]) / 2.0).max(0.0);
        grid_size[d] = covering + 3;
        start[d] - shift - grid_spacing[d]
    });

    let grid = BSplineGrid::new(grid_size, origin, grid_spacing);
    debug!(
        size = ?grid.size(),
        origin = ?grid.origin.to_vec(),
        spacing = ?grid.spacing.to_vec(),
        "Defined B-spline grid"
    );
    Ok(grid)
}

/// Lower corner and extent of the image corners, optionally mapped.
fn bounding_box<const D: usize>(
    geometry: &ImageGeometry<D>,
    initial_transform: Option<&dyn AdvancedTransform<D>>,
) -> Result<(Point<D>, [f64; D])> {
    let mut lower = [f64::INFINITY; D];
    let mut upper = [f64::NEG_INFINITY; D];
    for corner in geometry.corner_points() {
        let corner = match initial_transform {
            Some(transform) => transform.transform_point(&corner)?,
            None => corner,
        };
        for d in 0..D {
            lower[d] = lower[d].min(corner[d]);
            upper[d] = upper[d].max(corner[d]);
        }
    }
    Ok((Point::new(lower), std::array::from_fn(|d| upper[d] - lower[d])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpkit_core::spatial::{Direction, Vector};
    use warpkit_core::transform::{BSplineTransform, TranslationTransform};

    #[test]
    fn test_exact_multiple() {
        let geometry = ImageGeometry::axis_aligned([65, 49], Point::origin(), Spacing::new([1.0, 1.5]));
        let grid = define_grid(&geometry, &[16.0; 2], None).unwrap();
        assert_eq!(grid.size(), [8, 7]);
        assert_eq!(grid.origin, Point::new([-16.0, -24.0]));
        assert_eq!(grid.spacing, Spacing::new([16.0, 24.0]));
        assert_eq!(grid.region.index, [0, 0]);
    }

    #[test]
    fn test_overshoot_is_centred() {
        // Extent 10, grid spacing 4: 4 covering nodes span 12, overshoot 2.
        let geometry = ImageGeometry::axis_aligned([11], Point::new([5.0]), Spacing::uniform(1.0));
        let grid = define_grid(&geometry, &[4.0], None).unwrap();
        assert_eq!(grid.size(), [7]);
        assert_eq!(grid.origin, Point::new([5.0 - 1.0 - 4.0]));
    }

    #[test]
    fn test_single_voxel_axis() {
        let geometry = ImageGeometry::axis_aligned([1, 10], Point::origin(), Spacing::uniform(1.0));
        let grid = define_grid(&geometry, &[2.0; 2], None).unwrap();
        assert_eq!(grid.size()[0], 4);
        assert_eq!(grid.origin[0], -2.0);
    }

    #[test]
    fn test_rotated_image_uses_bounding_box() {
        let mut direction = Direction::<2>::identity();
        direction[(0, 0)] = 0.0;
        direction[(0, 1)] = -1.0;
        direction[(1, 0)] = 1.0;
        direction[(1, 1)] = 0.0;
        let geometry = ImageGeometry::new([9, 5], Point::origin(), Spacing::uniform(1.0), direction);
        let grid = define_grid(&geometry, &[2.0; 2], None).unwrap();
        // Rotated extent is 4 along x (from -4 to 0) and 8 along y.
        assert_eq!(grid.size(), [6, 8]);
        assert_eq!(grid.origin, Point::new([-6.0, -2.0]));
    }

    #[test]
    fn test_initial_transform_shifts_grid() {
        let geometry = ImageGeometry::axis_aligned([9, 9], Point::origin(), Spacing::uniform(1.0));
        let shift = TranslationTransform::new(Vector::new([3.0, -1.0]));
        let plain = define_grid(&geometry, &[2.0; 2], None).unwrap();
        let composed = define_grid(&geometry, &[2.0; 2], Some(&shift)).unwrap();
        assert_eq!(composed.size(), plain.size());
        assert_eq!(composed.origin, Point::new([plain.origin[0] + 3.0, plain.origin[1] - 1.0]));
    }

    /// Displacement of both image corners with every coefficient set to one.
    fn corner_displacements(geometry: &ImageGeometry<1>, factor: f64) -> Vec<f64> {
        let grid = define_grid(geometry, &[factor], None).unwrap();
        let transform = BSplineTransform::with_parameters(grid, vec![1.0; grid.number_of_nodes()]).unwrap();
        geometry
            .corner_points()
            .iter()
            .map(|corner| transform.transform_point(corner).unwrap()[0] - corner[0])
            .collect()
    }

    #[test]
    fn test_image_corners_have_full_support() {
        for size in 1..40usize {
            for s in (1..40).step_by(2) {
                for o in (-185..149).step_by(11) {
                    let geometry =
                        ImageGeometry::axis_aligned([size], Point::new([o as f64 * 0.01]), Spacing::uniform(s as f64 * 0.1));
                    for factor in [1.0, 1.5, 2.0, 3.0, 7.0, 8.0, 16.0] {
                        for displacement in corner_displacements(&geometry, factor) {
                            assert!(
                                (displacement - 1.0).abs() < 1e-9,
                                "size {size}, spacing {}, origin {}, factor {factor}: {displacement}",
                                s as f64 * 0.1,
                                o as f64 * 0.01
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_extent_within_tolerance_of_covering_nodes() {
        // Extent / grid spacing is 1 + 1e-7, which still rounds to two covering nodes.
        let geometry = ImageGeometry::axis_aligned([2], Point::origin(), Spacing::uniform(1.0));
        let grid = define_grid(&geometry, &[0.9999999], None).unwrap();
        assert_eq!(grid.size(), [5]);
        assert_eq!(grid.origin[0], -0.9999999);
        for displacement in corner_displacements(&geometry, 0.9999999) {
            assert!((displacement - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let geometry = ImageGeometry::axis_aligned([0, 4], Point::origin(), Spacing::uniform(1.0));
        assert!(define_grid(&geometry, &[2.0; 2], None).is_err());
        let geometry = ImageGeometry::axis_aligned([4, 4], Point::origin(), Spacing::uniform(1.0));
        assert!(define_grid(&geometry, &[0.0, 2.0], None).is_err());
    }
}
