//! Spatial transforms for image registration.
//!
//! Point/Jacobian transforms with a flat parameter vector, a stack transform
//! that maps each slice of an N-D image with its own (N-1)-D transform, and a
//! dense cubic B-spline deformation together with the numerics to resample
//! its coefficients onto a denser control-point grid.

pub mod error;
pub mod image;
pub mod spatial;
pub mod transform;

pub use error::{Result, TransformError};
pub use image::ImageGeometry;
pub use spatial::{Direction, Point, Spacing, Vector};
pub use transform::{AdvancedTransform, Capability, Transform};
