//! Multi-resolution driver.
//!
//! Runs the lifecycle hooks of a component over all resolution levels
//! (coarse-to-fine) and hands each level to an external optimizer.

use tracing::info;
use warpkit_core::transform::AdvancedTransform;
use warpkit_core::ImageGeometry;

use crate::component::{RegistrationComponent, RegistrationContext};
use crate::error::Result;

/// Resolution schedule over a fixed image.
#[derive(Debug, Clone)]
pub struct ResolutionSchedule<const D: usize> {
    fixed_geometry: ImageGeometry<D>,
    number_of_resolutions: usize,
}

impl<const D: usize> ResolutionSchedule<D> {
    pub fn new(fixed_geometry: ImageGeometry<D>, number_of_resolutions: usize) -> Self {
        Self {
            fixed_geometry,
            number_of_resolutions,
        }
    }

    pub fn number_of_resolutions(&self) -> usize {
        self.number_of_resolutions
    }

    /// Execute the schedule.
    ///
    /// # Arguments
    /// * `component` - Transform driven through the lifecycle hooks
    /// * `optimize` - Called once per level with the level, the component and
    ///   the initial parameters; returns the optimized parameters
    ///
    /// # Returns
    /// The final context. An error from a hook or the optimizer aborts the
    /// schedule.
    pub fn run<C, F>(&self, component: &mut C, mut optimize: F) -> Result<RegistrationContext<D>>
    where
        C: RegistrationComponent<D> + AdvancedTransform<D>,
        F: FnMut(usize, &mut C, &[f64]) -> Result<Vec<f64>>,
    {
        let mut context = RegistrationContext::new(self.fixed_geometry.clone(), self.number_of_resolutions);
        component.before_registration(&mut context)?;

        for level in 0..self.number_of_resolutions {
            context.current_level = level;
            component.before_each_resolution(&mut context)?;

            let initial = context.initial_transform_parameters_of_next_level.clone();
            info!(
                "Starting level {}/{} with {} parameters",
                level + 1,
                self.number_of_resolutions,
                initial.len()
            );

            context.last_transform_parameters = optimize(level, component, &initial)?;
            component.after_each_resolution(&mut context)?;
        }

        component.after_registration(&mut context)?;
        Ok(context)
    }
}
