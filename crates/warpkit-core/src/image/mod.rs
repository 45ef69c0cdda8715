//! Image geometry.
//!
//! Transforms only need to know where the fixed image lives in physical space,
//! never its pixel data, so this module carries geometry alone.

pub mod geometry;

pub use geometry::ImageGeometry;
