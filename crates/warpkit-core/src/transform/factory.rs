//! Construction of transforms from their runtime type name.

use super::affine::AffineTransform;
use super::bspline::BSplineTransform;
use super::trait_::AdvancedTransform;
use super::translation::TranslationTransform;
use crate::error::{Result, TransformError};
use crate::spatial::Point;

/// Type names accepted by [`create_transform`].
pub const TRANSFORM_NAMES: &[&str] = &["TranslationTransform", "AffineTransform", "BSplineTransform"];

/// Build a default instance of the transform registered under `name`.
///
/// Translation and affine transforms start as the identity; the B-spline
/// transform starts on a degenerate grid with zero displacement.
pub fn create_transform<const D: usize>(name: &str) -> Result<Box<dyn AdvancedTransform<D>>> {
    match name {
        "TranslationTransform" => Ok(Box::new(TranslationTransform::<D>::default())),
        "AffineTransform" => Ok(Box::new(AffineTransform::<D>::identity(Point::origin()))),
        "BSplineTransform" => Ok(Box::new(BSplineTransform::<D>::default())),
        other => Err(TransformError::UnknownTransform(other.to_string())),
    }
}
