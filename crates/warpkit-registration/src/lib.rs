//! Multi-resolution B-spline registration support.
//!
//! Derives the control-point grid of a B-spline transform from the fixed
//! image, refines it between resolution levels while carrying the
//! deformation forward, and drives the registration lifecycle hooks.

pub mod bspline_transform;
pub mod component;
pub mod config;
pub mod error;
pub mod grid;
pub mod parameters;
pub mod report;
pub mod schedule;

pub use bspline_transform::MultiResolutionBSplineTransform;
pub use component::{RegistrationComponent, RegistrationContext};
pub use config::{BSplineTransformConfig, ResolvedBSplineConfig};
pub use error::{RegistrationError, Result};
pub use grid::define_grid;
pub use parameters::BSplineTransformParameters;
pub use report::{extended_version_information, format_arguments, report_terminating_error};
pub use schedule::ResolutionSchedule;
