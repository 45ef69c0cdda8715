//! Multi-resolution B-spline transform.
//!
//! Wraps a dense [`BSplineTransform`] and manages its control-point grid over
//! the resolution levels of a registration: the grid is derived from the
//! fixed image and a spacing factor, and when a level refines the grid the
//! current deformation is refitted onto the denser lattice.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use tracing::{debug, info, warn};
use warpkit_core::spatial::Point;
use warpkit_core::transform::{
    AdvancedTransform, BSplineGrid, BSplineTransform, Capability, Jacobian, NonZeroJacobianIndices, SpatialJacobian,
    Transform,
};
use warpkit_core::ImageGeometry;

use crate::component::{RegistrationComponent, RegistrationContext};
use crate::config::{BSplineTransformConfig, ResolvedBSplineConfig};
use crate::error::{RegistrationError, Result};
use crate::grid::define_grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Started,
    Level(usize),
    LevelDone(usize),
    Finished,
}

/// B-spline transform whose grid follows the resolution schedule.
#[derive(Debug)]
pub struct MultiResolutionBSplineTransform<const D: usize> {
    config: ResolvedBSplineConfig<D>,
    grid_spacing_factor: [f64; D],
    transform: BSplineTransform<D>,
    initial_transform: Option<Box<dyn AdvancedTransform<D>>>,
    stage: Stage,
}

impl<const D: usize> MultiResolutionBSplineTransform<D> {
    /// Create from a configuration, validated against `D`.
    pub fn new(config: &BSplineTransformConfig) -> Result<Self> {
        Ok(Self::from_resolved(config.resolve::<D>()?))
    }

    pub fn from_resolved(config: ResolvedBSplineConfig<D>) -> Self {
        let grid_spacing_factor = config.initial_grid_spacing_factor();
        Self {
            config,
            grid_spacing_factor,
            transform: BSplineTransform::default(),
            initial_transform: None,
            stage: Stage::Idle,
        }
    }

    pub fn config(&self) -> &ResolvedBSplineConfig<D> {
        &self.config
    }

    /// Current spacing factor, per axis.
    pub fn grid_spacing_factor(&self) -> [f64; D] {
        self.grid_spacing_factor
    }

    pub fn grid(&self) -> &BSplineGrid<D> {
        self.transform.grid()
    }

    pub fn bspline(&self) -> &BSplineTransform<D> {
        &self.transform
    }

    pub fn into_bspline(self) -> BSplineTransform<D> {
        self.transform
    }

    /// Transform applied before this one. With composition enabled the grid
    /// is placed over the fixed image as mapped by it.
    pub fn set_initial_transform(&mut self, transform: Box<dyn AdvancedTransform<D>>) {
        self.initial_transform = Some(transform);
    }

    pub fn initial_transform(&self) -> Option<&dyn AdvancedTransform<D>> {
        self.initial_transform.as_deref()
    }

    /// Spacing factor at level 0 from the configured final spacing.
    pub fn compute_initial_grid_spacing_factor(&self) -> [f64; D] {
        self.config.initial_grid_spacing_factor()
    }

    /// Grid for `geometry` at the current spacing factor.
    pub fn define_grid(&self, geometry: &ImageGeometry<D>) -> Result<BSplineGrid<D>> {
        self.grid_at(geometry, &self.grid_spacing_factor)
    }

    fn grid_at(&self, geometry: &ImageGeometry<D>, spacing_factor: &[f64; D]) -> Result<BSplineGrid<D>> {
        let initial = if self.config.use_composition {
            self.initial_transform.as_deref()
        } else {
            None
        };
        define_grid(geometry, spacing_factor, initial)
    }

    /// Set up the first level: coarsest grid, zero deformation.
    ///
    /// Returns the initial parameters for the optimizer.
    pub fn initialize_transform(&mut self, geometry: &ImageGeometry<D>) -> Result<Vec<f64>> {
        let spacing_factor = self.compute_initial_grid_spacing_factor();
        let grid = self.grid_at(geometry, &spacing_factor)?;
        self.transform.set_grid(grid)?;
        self.grid_spacing_factor = spacing_factor;
        info!(
            spacing_factor = ?self.grid_spacing_factor,
            grid_size = ?grid.size(),
            "Initialized B-spline grid"
        );
        Ok(self.transform.coefficients().to_vec())
    }

    /// Halve the spacing factor and refit `last_parameters` onto the denser
    /// grid.
    ///
    /// Returns the refitted parameters for the optimizer. On error the
    /// spacing factor, grid and coefficients are left unchanged.
    pub fn increase_scale(&mut self, geometry: &ImageGeometry<D>, last_parameters: &[f64]) -> Result<Vec<f64>> {
        let spacing_factor = self.grid_spacing_factor.map(|f| f / 2.0);
        let grid = self.grid_at(geometry, &spacing_factor)?;

        let mut coarse = self.transform.clone();
        coarse.set_parameters(last_parameters)?;
        let refined = coarse.refine(&grid);
        let transform = BSplineTransform::with_parameters(grid, refined.clone())?;
        info!(
            spacing_factor = ?spacing_factor,
            from = ?coarse.grid().size(),
            to = ?grid.size(),
            "Refined B-spline grid"
        );

        self.grid_spacing_factor = spacing_factor;
        self.transform = transform;
        Ok(refined)
    }

    fn expect_stage(&self, hook: &'static str, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(RegistrationError::lifecycle(
                hook,
                format!("expected stage {expected:?}, found {:?}", self.stage),
            ))
        }
    }
}

impl<const D: usize> RegistrationComponent<D> for MultiResolutionBSplineTransform<D> {
    /// Install a one-node grid with zero parameters.
    fn before_registration(&mut self, context: &mut RegistrationContext<D>) -> Result<()> {
        if context.number_of_resolutions != self.config.number_of_resolutions {
            return Err(warpkit_core::TransformError::mismatch(
                "number_of_resolutions",
                self.config.number_of_resolutions,
                context.number_of_resolutions,
            )
            .into());
        }
        self.transform = BSplineTransform::default();
        self.grid_spacing_factor = self.compute_initial_grid_spacing_factor();
        context.initial_transform_parameters_of_next_level = self.transform.coefficients().to_vec();
        self.stage = Stage::Started;
        debug!(levels = self.config.number_of_resolutions, "Installed degenerate B-spline grid");
        Ok(())
    }

    fn before_each_resolution(&mut self, context: &mut RegistrationContext<D>) -> Result<()> {
        let level = context.current_level;
        let expected = match level {
            0 => Stage::Started,
            _ => Stage::LevelDone(level - 1),
        };
        self.expect_stage("before_each_resolution", expected)?;

        let initial = if level == 0 {
            self.initialize_transform(&context.fixed_geometry)?
        } else {
            let last = if context.last_transform_parameters.is_empty() {
                self.transform.coefficients().to_vec()
            } else {
                context.last_transform_parameters.clone()
            };
            if self.config.upsamples_into(level) {
                self.increase_scale(&context.fixed_geometry, &last)?
            } else {
                warn!(level, "Keeping the B-spline grid of the previous resolution");
                self.transform.set_parameters(&last)?;
                last
            }
        };
        context.initial_transform_parameters_of_next_level = initial;
        self.stage = Stage::Level(level);
        Ok(())
    }

    fn after_each_resolution(&mut self, context: &mut RegistrationContext<D>) -> Result<()> {
        let level = context.current_level;
        self.expect_stage("after_each_resolution", Stage::Level(level))?;
        if !context.last_transform_parameters.is_empty() {
            self.transform.set_parameters(&context.last_transform_parameters)?;
        }
        self.stage = Stage::LevelDone(level);
        Ok(())
    }

    fn after_registration(&mut self, context: &mut RegistrationContext<D>) -> Result<()> {
        let last_level = context.number_of_resolutions.saturating_sub(1);
        self.expect_stage("after_registration", Stage::LevelDone(last_level))?;
        self.stage = Stage::Finished;
        info!(
            grid_size = ?self.transform.grid().size(),
            parameters = self.transform.number_of_parameters(),
            "B-spline registration finished"
        );
        Ok(())
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for MultiResolutionBSplineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> warpkit_core::Result<Tensor<B, 2>> {
        self.transform.transform_points(points)
    }
}

impl<const D: usize> AdvancedTransform<D> for MultiResolutionBSplineTransform<D> {
    fn name(&self) -> &'static str {
        "MultiResolutionBSplineTransform"
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.transform.capabilities()
    }

    fn transform_point(&self, point: &Point<D>) -> warpkit_core::Result<Point<D>> {
        self.transform.transform_point(point)
    }

    fn jacobian(
        &self,
        point: &Point<D>,
        jacobian: &mut Jacobian,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> warpkit_core::Result<()> {
        self.transform.jacobian(point, jacobian, nonzero_indices)
    }

    fn number_of_parameters(&self) -> usize {
        self.transform.number_of_parameters()
    }

    fn number_of_nonzero_jacobian_indices(&self) -> usize {
        self.transform.number_of_nonzero_jacobian_indices()
    }

    fn parameters(&self) -> warpkit_core::Result<Vec<f64>> {
        self.transform.parameters()
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> warpkit_core::Result<()> {
        self.transform.set_parameters(parameters)
    }

    fn fixed_parameters(&self) -> Vec<f64> {
        self.transform.fixed_parameters()
    }

    fn set_fixed_parameters(&mut self, fixed_parameters: &[f64]) -> warpkit_core::Result<()> {
        self.transform.set_fixed_parameters(fixed_parameters)
    }

    fn create_another(&self) -> Box<dyn AdvancedTransform<D>> {
        Box::new(Self::from_resolved(self.config.clone()))
    }

    fn spatial_jacobian(&self, point: &Point<D>) -> warpkit_core::Result<SpatialJacobian<D>> {
        self.transform.spatial_jacobian(point)
    }
}
