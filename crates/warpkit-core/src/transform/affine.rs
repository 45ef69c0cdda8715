//! Affine transform implementation.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use nalgebra::{DMatrix, SMatrix};

use super::trait_::{
    check_length, AdvancedTransform, Capability, Jacobian, JacobianOfSpatialJacobian, NonZeroJacobianIndices,
    SpatialHessian, SpatialJacobian, Transform,
};
use crate::error::{Result, TransformError};
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

/// Affine Transform (Linear transformation + Translation).
///
/// Represents a general affine transformation with a fixed center:
/// T(x) = A(x - c) + c + t
///
/// Parameters are the `D x D` entries of `A` in row-major order followed by
/// the `D` components of `t`. The center `c` is the fixed parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: Vector<D>,
    center: Point<D>,
}

impl<const D: usize> AffineTransform<D> {
    pub fn new(matrix: SMatrix<f64, D, D>, translation: Vector<D>, center: Point<D>) -> Self {
        Self {
            matrix,
            translation,
            center,
        }
    }

    /// Identity transform around the given center.
    pub fn identity(center: Point<D>) -> Self {
        Self::new(SMatrix::identity(), Vector::zeros(), center)
    }

    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    pub fn translation(&self) -> &Vector<D> {
        &self.translation
    }

    pub fn center(&self) -> &Point<D> {
        &self.center
    }
}

impl<const D: usize> Default for AffineTransform<D> {
    fn default() -> Self {
        Self::identity(Point::origin())
    }
}

impl<const D: usize> AdvancedTransform<D> for AffineTransform<D> {
    fn name(&self) -> &'static str {
        "AffineTransform"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn transform_point(&self, point: &Point<D>) -> Result<Point<D>> {
        let centered = *point - self.center;
        Ok(self.center + Vector(self.matrix * centered.0) + self.translation)
    }

    fn jacobian(
        &self,
        point: &Point<D>,
        jacobian: &mut Jacobian,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        // dy_i/dA_ij = (x_j - c_j), dy_i/dt_i = 1
        let centered = *point - self.center;
        let n = self.number_of_parameters();
        *jacobian = DMatrix::zeros(D, n);
        for i in 0..D {
            for j in 0..D {
                jacobian[(i, i * D + j)] = centered[j];
            }
            jacobian[(i, D * D + i)] = 1.0;
        }
        nonzero_indices.clear();
        nonzero_indices.extend(0..n);
        Ok(())
    }

    fn number_of_parameters(&self) -> usize {
        D * D + D
    }

    fn parameters(&self) -> Result<Vec<f64>> {
        let mut parameters = Vec::with_capacity(self.number_of_parameters());
        for i in 0..D {
            for j in 0..D {
                parameters.push(self.matrix[(i, j)]);
            }
        }
        parameters.extend(self.translation.to_vec());
        Ok(parameters)
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        check_length("set_parameters", self.number_of_parameters(), parameters.len())?;
        self.matrix = SMatrix::from_fn(|i, j| parameters[i * D + j]);
        self.translation = Vector::from_fn(|i| parameters[D * D + i]);
        Ok(())
    }

    fn fixed_parameters(&self) -> Vec<f64> {
        self.center.to_vec()
    }

    fn set_fixed_parameters(&mut self, fixed_parameters: &[f64]) -> Result<()> {
        check_length("set_fixed_parameters", D, fixed_parameters.len())?;
        self.center = Point::from_fn(|i| fixed_parameters[i]);
        Ok(())
    }

    fn create_another(&self) -> Box<dyn AdvancedTransform<D>> {
        Box::new(Self::default())
    }

    fn transform_vector(&self, vector: &Vector<D>) -> Result<Vector<D>> {
        Ok(Vector(self.matrix * vector.0))
    }

    fn transform_covariant_vector(&self, vector: &Vector<D>) -> Result<Vector<D>> {
        let inverse = self
            .matrix
            .try_inverse()
            .ok_or_else(|| TransformError::invalid_configuration("affine matrix is singular"))?;
        Ok(Vector(inverse.transpose() * vector.0))
    }

    fn spatial_jacobian(&self, _point: &Point<D>) -> Result<SpatialJacobian<D>> {
        Ok(self.matrix)
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
        let n = self.number_of_parameters();
        jsj.clear();
        jsj.extend((0..n).map(|p| {
            let mut derivative = SMatrix::<f64, D, D>::zeros();
            if p < D * D {
                derivative[(p / D, p % D)] = 1.0;
            }
            derivative
        }));
        nonzero_indices.clear();
        nonzero_indices.extend(0..n);
        Ok(())
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        // In row vector notation: y = (x - c) @ A^T + c + t
        let device = points.device();
        let to_f32 = |values: Vec<f64>| values.into_iter().map(|v| v as f32).collect::<Vec<f32>>();

        let row_major: Vec<f64> = (0..D * D).map(|k| self.matrix[(k / D, k % D)]).collect();
        let a = Tensor::<B, 1>::from_data(TensorData::new(to_f32(row_major), [D * D]), &device).reshape([D, D]);
        let c = Tensor::<B, 1>::from_data(TensorData::new(to_f32(self.center.to_vec()), [D]), &device).reshape([1, D]);
        let t = Tensor::<B, 1>::from_data(TensorData::new(to_f32(self.translation.to_vec()), [D]), &device)
            .reshape([1, D]);

        let centered = points - c.clone();
        let rotated = centered.matmul(a.transpose());
        Ok(rotated + c + t)
    }
}
