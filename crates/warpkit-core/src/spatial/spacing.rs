//! Spacing type for physical distances between samples along each axis.

use super::Vector;

/// Spacing between adjacent samples along each axis.
///
/// Used both for image voxel spacing and for B-spline control point spacing.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Create uniform spacing (same value for all dimensions).
    pub fn uniform(value: f64) -> Self {
        Self::from_fn(|_| value)
    }

    /// Component-wise product, e.g. image spacing times a grid spacing factor.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self(self.0.component_mul(&other.0))
    }

    /// Check that every component is strictly positive and finite.
    pub fn is_positive(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        let s = Spacing3::uniform(2.0);
        assert_eq!(s, Spacing3::new([2.0, 2.0, 2.0]));
    }

    #[test]
    fn test_spacing_component_mul() {
        let image = Spacing3::new([0.5, 1.0, 2.0]);
        let factor = Spacing3::uniform(8.0);
        assert_eq!(image.component_mul(&factor), Spacing3::new([4.0, 8.0, 16.0]));
    }

    #[test]
    fn test_spacing_is_positive() {
        assert!(Spacing3::uniform(1.0).is_positive());
        assert!(!Spacing3::new([1.0, 0.0, 1.0]).is_positive());
        assert!(!Spacing3::new([1.0, f64::NAN, 1.0]).is_positive());
    }
}
