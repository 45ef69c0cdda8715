//! Registration lifecycle shared by all components.
//!
//! A registration runs `before_registration`, then for every resolution
//! level `before_each_resolution`, the optimizer, and
//! `after_each_resolution`, and finally `after_registration`.

use warpkit_core::ImageGeometry;

use crate::error::Result;

/// State shared between the driver and the components during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationContext<const D: usize> {
    /// Geometry of the fixed image at the current level.
    pub fixed_geometry: ImageGeometry<D>,
    pub number_of_resolutions: usize,
    pub current_level: usize,
    /// Parameters reached by the optimizer at the end of the last level.
    pub last_transform_parameters: Vec<f64>,
    /// Starting point handed to the optimizer for the coming level.
    pub initial_transform_parameters_of_next_level: Vec<f64>,
}

impl<const D: usize> RegistrationContext<D> {
    pub fn new(fixed_geometry: ImageGeometry<D>, number_of_resolutions: usize) -> Self {
        Self {
            fixed_geometry,
            number_of_resolutions,
            current_level: 0,
            last_transform_parameters: Vec::new(),
            initial_transform_parameters_of_next_level: Vec::new(),
        }
    }
}

/// Hooks called by the registration driver.
///
/// Every hook defaults to doing nothing.
pub trait RegistrationComponent<const D: usize> {
    fn before_registration(&mut self, _context: &mut RegistrationContext<D>) -> Result<()> {
        Ok(())
    }

    fn before_each_resolution(&mut self, _context: &mut RegistrationContext<D>) -> Result<()> {
        Ok(())
    }

    fn after_each_resolution(&mut self, _context: &mut RegistrationContext<D>) -> Result<()> {
        Ok(())
    }

    fn after_registration(&mut self, _context: &mut RegistrationContext<D>) -> Result<()> {
        Ok(())
    }
}
