//! Configuration of the multi-resolution B-spline transform.

use serde::{Deserialize, Serialize};
use warpkit_core::TransformError;

use crate::error::{RegistrationError, Result};

/// User-facing configuration.
///
/// Values are kept as given so the configuration round-trips through serde;
/// [`BSplineTransformConfig::resolve`] checks and expands them for a
/// concrete dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BSplineTransformConfig {
    /// Control-point spacing at the last resolution, in fixed-image voxels.
    /// One value for all axes or one per axis.
    pub final_grid_spacing: Vec<f64>,
    /// Whether the grid is refined when entering a resolution level.
    /// One value for all transitions, one per transition, or one per level
    /// (the entry of level 0 is ignored).
    pub upsample_grid_option: Vec<bool>,
    /// Number of resolution levels.
    pub number_of_resolutions: usize,
    /// Place the grid over the fixed image as seen through the initial
    /// transform.
    pub use_composition: bool,
}

impl Default for BSplineTransformConfig {
    fn default() -> Self {
        Self {
            final_grid_spacing: vec![8.0],
            upsample_grid_option: vec![true],
            number_of_resolutions: 3,
            use_composition: false,
        }
    }
}

impl BSplineTransformConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_final_grid_spacing(mut self, spacing: Vec<f64>) -> Self {
        self.final_grid_spacing = spacing;
        self
    }

    pub fn with_upsample_grid_option(mut self, option: Vec<bool>) -> Self {
        self.upsample_grid_option = option;
        self
    }

    pub fn with_number_of_resolutions(mut self, levels: usize) -> Self {
        self.number_of_resolutions = levels;
        self
    }

    pub fn with_composition(mut self, use_composition: bool) -> Self {
        self.use_composition = use_composition;
        self
    }

    /// Validate against dimension `D` and expand broadcast values.
    pub fn resolve<const D: usize>(&self) -> Result<ResolvedBSplineConfig<D>> {
        let levels = self.number_of_resolutions;
        if levels == 0 {
            return Err(RegistrationError::invalid_configuration(
                "number_of_resolutions must be at least 1",
            ));
        }

        let final_grid_spacing: [f64; D] = match self.final_grid_spacing.len() {
            1 => [self.final_grid_spacing[0]; D],
            n if n == D => std::array::from_fn(|d| self.final_grid_spacing[d]),
            n => {
                return Err(TransformError::mismatch("final_grid_spacing", format!("1 or {D} values"), n).into());
            }
        };
        if final_grid_spacing.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(RegistrationError::invalid_configuration(format!(
                "final_grid_spacing must be positive, got {:?}",
                self.final_grid_spacing
            )));
        }

        let transitions = levels - 1;
        let options = &self.upsample_grid_option;
        let upsample_transitions = if options.len() == 1 {
            vec![options[0]; transitions]
        } else if options.len() == transitions {
            options.clone()
        } else if options.len() == levels {
            options[1..].to_vec()
        } else {
            return Err(TransformError::mismatch(
                "upsample_grid_option",
                format!("1, {transitions} or {levels} values"),
                options.len(),
            )
            .into());
        };

        Ok(ResolvedBSplineConfig {
            final_grid_spacing,
            upsample_transitions,
            number_of_resolutions: levels,
            use_composition: self.use_composition,
        })
    }
}

/// Configuration checked against a dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBSplineConfig<const D: usize> {
    pub final_grid_spacing: [f64; D],
    /// Entry `k - 1` tells whether the grid is refined entering level `k`.
    pub upsample_transitions: Vec<bool>,
    pub number_of_resolutions: usize,
    pub use_composition: bool,
}

impl<const D: usize> ResolvedBSplineConfig<D> {
    /// Whether entering `level` refines the grid. Never true for level 0.
    pub fn upsamples_into(&self, level: usize) -> bool {
        level > 0 && self.upsample_transitions.get(level - 1).copied().unwrap_or(false)
    }

    /// Spacing factor at level 0: the final spacing doubled once for every
    /// refining transition.
    pub fn initial_grid_spacing_factor(&self) -> [f64; D] {
        let refinements = self.upsample_transitions.iter().filter(|&&u| u).count();
        let scale = 2f64.powi(refinements as i32);
        self.final_grid_spacing.map(|s| s * scale)
    }

    /// Spacing factor in effect at `level`.
    pub fn grid_spacing_factor_at(&self, level: usize) -> [f64; D] {
        let halvings = (1..=level).filter(|&k| self.upsamples_into(k)).count();
        let scale = 0.5f64.powi(halvings as i32);
        self.initial_grid_spacing_factor().map(|s| s * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let resolved = BSplineTransformConfig::default().resolve::<3>().unwrap();
        assert_eq!(resolved.final_grid_spacing, [8.0; 3]);
        assert_eq!(resolved.upsample_transitions, vec![true, true]);
        assert_eq!(resolved.initial_grid_spacing_factor(), [32.0; 3]);
    }

    #[test]
    fn test_spacing_factor_per_level() {
        let resolved = BSplineTransformConfig::new().resolve::<3>().unwrap();
        assert_eq!(resolved.grid_spacing_factor_at(0), [32.0; 3]);
        assert_eq!(resolved.grid_spacing_factor_at(1), [16.0; 3]);
        assert_eq!(resolved.grid_spacing_factor_at(2), [8.0; 3]);
    }

    #[test]
    fn test_without_upsampling_factor_is_final_spacing() {
        let resolved = BSplineTransformConfig::new()
            .with_upsample_grid_option(vec![false])
            .resolve::<2>()
            .unwrap();
        for level in 0..3 {
            assert_eq!(resolved.grid_spacing_factor_at(level), [8.0; 2]);
        }
    }

    #[test]
    fn test_upsample_option_layouts() {
        let per_transition = BSplineTransformConfig::new()
            .with_number_of_resolutions(4)
            .with_upsample_grid_option(vec![true, false, true])
            .resolve::<2>()
            .unwrap();
        let per_level = BSplineTransformConfig::new()
            .with_number_of_resolutions(4)
            .with_upsample_grid_option(vec![false, true, false, true])
            .resolve::<2>()
            .unwrap();
        assert_eq!(per_transition, per_level);
        assert!(!per_level.upsamples_into(0));
        assert!(per_level.upsamples_into(1));
        assert!(!per_level.upsamples_into(2));
        assert_eq!(per_level.initial_grid_spacing_factor(), [32.0; 2]);
        assert_eq!(per_level.grid_spacing_factor_at(2), [16.0; 2]);
        assert_eq!(per_level.grid_spacing_factor_at(3), [8.0; 2]);
    }

    #[test]
    fn test_upsample_option_arity_is_checked() {
        let err = BSplineTransformConfig::new()
            .with_number_of_resolutions(4)
            .with_upsample_grid_option(vec![true, true])
            .resolve::<3>()
            .unwrap_err();
        assert!(matches!(
            err.as_transform_error(),
            Some(TransformError::ConfigurationMismatch {
                operation: "upsample_grid_option",
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_grid_spacing_arity() {
        let per_axis = BSplineTransformConfig::new()
            .with_final_grid_spacing(vec![4.0, 6.0, 8.0])
            .resolve::<3>()
            .unwrap();
        assert_eq!(per_axis.final_grid_spacing, [4.0, 6.0, 8.0]);

        let err = BSplineTransformConfig::new()
            .with_final_grid_spacing(vec![4.0, 6.0])
            .resolve::<3>()
            .unwrap_err();
        assert!(matches!(
            err.as_transform_error(),
            Some(TransformError::ConfigurationMismatch { actual: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            BSplineTransformConfig::new().with_number_of_resolutions(0).resolve::<2>(),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            BSplineTransformConfig::new().with_final_grid_spacing(vec![-1.0]).resolve::<2>(),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_single_level_accepts_any_broadcast() {
        let resolved = BSplineTransformConfig::new()
            .with_number_of_resolutions(1)
            .resolve::<2>()
            .unwrap();
        assert!(resolved.upsample_transitions.is_empty());
        assert_eq!(resolved.initial_grid_spacing_factor(), [8.0; 2]);
    }
}
