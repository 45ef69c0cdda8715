//! Transform types and operations.
//!
//! This module provides transform traits and implementations
//! for spatial coordinate transformations.

pub mod trait_;
pub mod translation;
pub mod affine;
pub mod bspline;
pub mod stack;
pub mod factory;

pub use trait_::{
    points_from_tensor, points_to_tensor, transform_points_pointwise, AdvancedTransform, Capability, Jacobian,
    JacobianOfSpatialHessian, JacobianOfSpatialJacobian, NonZeroJacobianIndices, SpatialHessian, SpatialJacobian,
    Transform,
};
pub use translation::TranslationTransform;
pub use affine::AffineTransform;
pub use bspline::{BSplineGrid, BSplineTransform, GridRegion};
pub use stack::StackTransform;
pub use factory::{create_transform, TRANSFORM_NAMES};
