//! Transform contracts.
//!
//! Two views of the same mapping live here:
//! * [`Transform`] maps a batch of points stored in a Burn tensor, which is
//!   how metrics sample whole images at once.
//! * [`AdvancedTransform`] maps single points in `f64` and exposes the flat
//!   parameter vector and its sparse Jacobian, which is what gradient-based
//!   optimizers consume.

use std::fmt::Debug;

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use nalgebra::{DMatrix, SMatrix};

use crate::error::{Result, TransformError};
use crate::spatial::{Point, Vector};

/// Derivative of the output point with respect to the non-zero parameters.
///
/// Shape `[D, k]` where `k` is the number of non-zero Jacobian indices.
pub type Jacobian = DMatrix<f64>;

/// Global parameter indices matching the columns of a [`Jacobian`].
pub type NonZeroJacobianIndices = Vec<usize>;

/// Derivative of the output point with respect to the input point.
pub type SpatialJacobian<const D: usize> = SMatrix<f64, D, D>;

/// Second derivatives of the output point, one `D x D` matrix per output axis.
pub type SpatialHessian<const D: usize> = Vec<SMatrix<f64, D, D>>;

/// Derivative of the spatial Jacobian, one matrix per non-zero parameter.
pub type JacobianOfSpatialJacobian<const D: usize> = Vec<SMatrix<f64, D, D>>;

/// Derivative of the spatial Hessian, one Hessian per non-zero parameter.
pub type JacobianOfSpatialHessian<const D: usize> = Vec<SpatialHessian<D>>;

/// Operations a transform may or may not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    PointTransform,
    Jacobian,
    VectorTransform,
    CovariantVectorTransform,
    SpatialJacobian,
    SpatialHessian,
    JacobianOfSpatialJacobian,
    JacobianOfSpatialHessian,
}

impl Capability {
    /// Name of the trait method implementing this capability.
    pub const fn operation(self) -> &'static str {
        match self {
            Self::PointTransform => "transform_point",
            Self::Jacobian => "jacobian",
            Self::VectorTransform => "transform_vector",
            Self::CovariantVectorTransform => "transform_covariant_vector",
            Self::SpatialJacobian => "spatial_jacobian",
            Self::SpatialHessian => "spatial_hessian",
            Self::JacobianOfSpatialJacobian => "jacobian_of_spatial_jacobian",
            Self::JacobianOfSpatialHessian => "jacobian_of_spatial_hessian",
        }
    }
}

/// Batch transform over Burn tensors.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `D` - The spatial dimensionality
pub trait Transform<B: Backend, const D: usize> {
    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, D]` containing the input points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, D]` containing the transformed points
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>>;
}

/// Parametric point transform as seen by an optimizer.
///
/// Query methods take `&self` and return their results by value or through
/// caller-owned output buffers, so a transform can be shared between threads
/// that evaluate different points. Parameter updates take `&mut self` and must
/// be serialized against in-flight queries by the caller.
///
/// Operations outside [`AdvancedTransform::capabilities`] fail with
/// [`TransformError::UnsupportedOperation`].
pub trait AdvancedTransform<const D: usize>: Debug + Send + Sync {
    /// Runtime type name, also used by the transform factory.
    fn name(&self) -> &'static str;

    /// The operations this transform implements.
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Map a point from the fixed to the moving space.
    fn transform_point(&self, point: &Point<D>) -> Result<Point<D>>;

    /// Sparse Jacobian with respect to the parameters.
    ///
    /// Writes a `[D, k]` matrix into `jacobian` and the `k` global parameter
    /// indices of its columns into `nonzero_indices`.
    fn jacobian(
        &self,
        point: &Point<D>,
        jacobian: &mut Jacobian,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()>;

    fn number_of_parameters(&self) -> usize;

    /// Upper bound on `k` in [`AdvancedTransform::jacobian`].
    fn number_of_nonzero_jacobian_indices(&self) -> usize {
        self.number_of_parameters()
    }

    fn parameters(&self) -> Result<Vec<f64>>;

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()>;

    /// Parameters that are not optimized but are needed to reconstruct the
    /// transform (grid geometry, centers of rotation, ...).
    fn fixed_parameters(&self) -> Vec<f64>;

    fn set_fixed_parameters(&mut self, fixed_parameters: &[f64]) -> Result<()>;

    /// A fresh default instance of the same runtime type.
    fn create_another(&self) -> Box<dyn AdvancedTransform<D>>;

    /// Deep copy: same runtime type, fixed parameters and parameters.
    fn clone_transform(&self) -> Result<Box<dyn AdvancedTransform<D>>> {
        let mut copy = self.create_another();
        copy.set_fixed_parameters(&self.fixed_parameters())?;
        copy.set_parameters(&self.parameters()?)?;
        Ok(copy)
    }

    fn transform_vector(&self, _vector: &Vector<D>) -> Result<Vector<D>> {
        Err(TransformError::unsupported(self.name(), "transform_vector"))
    }

    fn transform_covariant_vector(&self, _vector: &Vector<D>) -> Result<Vector<D>> {
        Err(TransformError::unsupported(self.name(), "transform_covariant_vector"))
    }

    fn spatial_jacobian(&self, _point: &Point<D>) -> Result<SpatialJacobian<D>> {
        Err(TransformError::unsupported(self.name(), "spatial_jacobian"))
    }

    fn spatial_hessian(&self, _point: &Point<D>) -> Result<SpatialHessian<D>> {
        Err(TransformError::unsupported(self.name(), "spatial_hessian"))
    }

    fn jacobian_of_spatial_jacobian(
        &self,
        _point: &Point<D>,
        _jsj: &mut JacobianOfSpatialJacobian<D>,
        _nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        Err(TransformError::unsupported(self.name(), "jacobian_of_spatial_jacobian"))
    }

    fn jacobian_of_spatial_hessian(
        &self,
        _point: &Point<D>,
        _jsh: &mut JacobianOfSpatialHessian<D>,
        _nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        Err(TransformError::unsupported(self.name(), "jacobian_of_spatial_hessian"))
    }
}

/// Check a parameter slice length against the expected count.
pub(crate) fn check_length(operation: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransformError::mismatch(operation, expected, actual))
    }
}

/// Read a `[Batch, D]` tensor back as `f64` points.
pub fn points_from_tensor<B: Backend, const D: usize>(points: Tensor<B, 2>) -> Result<Vec<Point<D>>> {
    let [_, rank] = points.dims();
    check_length("transform_points", D, rank)?;
    let values = points
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TransformError::TensorData(format!("{e:?}")))?;
    Ok(values
        .chunks_exact(D)
        .map(|chunk| Point::from_fn(|i| chunk[i] as f64))
        .collect())
}

/// Pack `f64` points into a `[Batch, D]` tensor.
pub fn points_to_tensor<B: Backend, const D: usize>(points: &[Point<D>], device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = points
        .iter()
        .flat_map(|p| (0..D).map(move |i| p[i] as f32))
        .collect();
    Tensor::<B, 1>::from_data(TensorData::new(values, [points.len() * D]), device).reshape([points.len(), D])
}

/// Batch evaluation through [`AdvancedTransform::transform_point`].
///
/// Used by transforms whose per-point routing has no tensor formulation; the
/// first failing point aborts the batch.
pub fn transform_points_pointwise<B, T, const D: usize>(transform: &T, points: Tensor<B, 2>) -> Result<Tensor<B, 2>>
where
    B: Backend,
    T: AdvancedTransform<D> + ?Sized,
{
    let device = points.device();
    let mapped = points_from_tensor::<B, D>(points)?
        .iter()
        .map(|p| transform.transform_point(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(points_to_tensor::<B, D>(&mapped, &device))
}
