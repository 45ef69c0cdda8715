//! Translation transform implementation.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use nalgebra::{DMatrix, SMatrix};

use super::trait_::{
    check_length, AdvancedTransform, Capability, Jacobian, JacobianOfSpatialJacobian, NonZeroJacobianIndices,
    SpatialHessian, SpatialJacobian, Transform,
};
use crate::error::Result;
use crate::spatial::{Point, Vector};

const CAPABILITIES: &[Capability] = &[
    Capability::PointTransform,
    Capability::Jacobian,
    Capability::VectorTransform,
    Capability::CovariantVectorTransform,
    Capability::SpatialJacobian,
    Capability::SpatialHessian,
    Capability::JacobianOfSpatialJacobian,
];

/// Translates points by a fixed offset vector.
///
/// Parameters are the `D` offset components.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationTransform<const D: usize> {
    offset: Vector<D>,
}

impl<const D: usize> TranslationTransform<D> {
    pub fn new(offset: Vector<D>) -> Self {
        Self { offset }
    }

    pub fn identity() -> Self {
        Self::new(Vector::zeros())
    }

    /// Get the translation vector.
    pub fn offset(&self) -> &Vector<D> {
        &self.offset
    }
}

impl<const D: usize> Default for TranslationTransform<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<const D: usize> AdvancedTransform<D> for TranslationTransform<D> {
    fn name(&self) -> &'static str {
        "TranslationTransform"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn transform_point(&self, point: &Point<D>) -> Result<Point<D>> {
        Ok(*point + self.offset)
    }

    fn jacobian(
        &self,
        _point: &Point<D>,
        jacobian: &mut Jacobian,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        *jacobian = DMatrix::identity(D, D);
        nonzero_indices.clear();
        nonzero_indices.extend(0..D);
        Ok(())
    }

    fn number_of_parameters(&self) -> usize {
        D
    }

    fn parameters(&self) -> Result<Vec<f64>> {
        Ok(self.offset.to_vec())
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        check_length("set_parameters", D, parameters.len())?;
        self.offset = Vector::from_fn(|i| parameters[i]);
        Ok(())
    }

    fn fixed_parameters(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_fixed_parameters(&mut self, fixed_parameters: &[f64]) -> Result<()> {
        check_length("set_fixed_parameters", 0, fixed_parameters.len())
    }

    fn create_another(&self) -> Box<dyn AdvancedTransform<D>> {
        Box::new(Self::identity())
    }

    fn transform_vector(&self, vector: &Vector<D>) -> Result<Vector<D>> {
        Ok(*vector)
    }

    fn transform_covariant_vector(&self, vector: &Vector<D>) -> Result<Vector<D>> {
        Ok(*vector)
    }

    fn spatial_jacobian(&self, _point: &Point<D>) -> Result<SpatialJacobian<D>> {
        Ok(SMatrix::identity())
    }

    fn spatial_hessian(&self, _point: &Point<D>) -> Result<SpatialHessian<D>> {
        Ok(vec![SMatrix::zeros(); D])
    }

    fn jacobian_of_spatial_jacobian(
        &self,
        _point: &Point<D>,
        jsj: &mut JacobianOfSpatialJacobian<D>,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        *jsj = vec![SMatrix::zeros(); D];
        nonzero_indices.clear();
        nonzero_indices.extend(0..D);
        Ok(())
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for TranslationTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        // Broadcast translation [1, D] over [Batch, D]
        let offset: Vec<f32> = self.offset.to_vec().iter().map(|&v| v as f32).collect();
        let t = Tensor::<B, 1>::from_data(TensorData::new(offset, [D]), &points.device()).reshape([1, D]);
        Ok(points + t)
    }
}
