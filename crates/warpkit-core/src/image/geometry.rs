//! Physical geometry of a sampled image: size, origin, spacing, direction.

use crate::spatial::{Direction, Point, Spacing, Vector};

/// Geometry of an image in physical space.
///
/// # Coordinate Systems
/// * **Index Space**: discrete voxel indices `0..size[d]`
/// * **Physical Space**: `point = origin + Direction * (index * spacing)`
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry<const D: usize> {
    size: [usize; D],
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

impl<const D: usize> ImageGeometry<D> {
    /// Create a geometry with an explicit direction matrix.
    pub fn new(size: [usize; D], origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            size,
            origin,
            spacing,
            direction,
        }
    }

    /// Create an axis-aligned geometry (identity direction).
    pub fn axis_aligned(size: [usize; D], origin: Point<D>, spacing: Spacing<D>) -> Self {
        Self::new(size, origin, spacing, Direction::identity())
    }

    pub fn size(&self) -> [usize; D] {
        self.size
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Convert a continuous index to a physical point.
    pub fn index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let scaled = Vector::<D>::from_fn(|i| index[i] * self.spacing[i]);
        self.origin + self.direction * scaled
    }

    /// Physical positions of the `2^D` corner voxels.
    ///
    /// Corner `k` takes index `size[d] - 1` along axis `d` when bit `d` of `k`
    /// is set and `0` otherwise.
    pub fn corner_points(&self) -> Vec<Point<D>> {
        (0..1usize << D)
            .map(|corner| {
                let index = Point::<D>::from_fn(|d| {
                    if corner & (1 << d) != 0 {
                        self.size[d].saturating_sub(1) as f64
                    } else {
                        0.0
                    }
                });
                self.index_to_physical_point(&index)
            })
            .collect()
    }
}
