//! Spatial value types: points, vectors, spacing and direction matrices.
//!
//! All types wrap nalgebra statically-sized storage so that dimensionality is
//! checked at compile time throughout the transform code.

pub mod point;
pub mod vector;
pub mod spacing;
pub mod direction;

pub use point::Point;
pub use vector::Vector;
pub use spacing::Spacing;
pub use direction::Direction;
