//! B-Spline transform implementation.
//!
//! This module provides a dense cubic B-Spline free-form deformation:
//! `T(x) = x + sum_k B_k(x) c_k`, where `c_k` are the control-point
//! displacements of a regular lattice.
//!
//! Parameters are stored dimension-major: the `N` displacements along axis 0
//! come first, then the `N` displacements along axis 1, and so on. Within one
//! block nodes are ordered with axis 0 fastest.

mod grid;
pub mod kernel;
mod refine;

pub use grid::{BSplineGrid, GridRegion};
pub use refine::decompose_in_place;

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use self::kernel::SUPPORT;
use super::trait_::{
    check_length, AdvancedTransform, Capability, Jacobian, NonZeroJacobianIndices, SpatialJacobian, Transform,
};
use crate::error::Result;
use crate::spatial::Point;

const CAPABILITIES: &[Capability] = &[
    Capability::PointTransform,
    Capability::Jacobian,
    Capability::SpatialJacobian,
];

/// Per-axis support of a point inside the valid region.
struct Support<const D: usize> {
    start: [i64; D],
    u: [f64; D],
}

/// B-Spline Transform (Free-form deformation).
///
/// Uses a grid of control points to define a smooth deformation field.
/// Points whose 4-node support is not entirely inside the grid region are
/// mapped to themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineTransform<const D: usize> {
    grid: BSplineGrid<D>,
    parameters: Vec<f64>,
}

impl<const D: usize> Default for BSplineTransform<D> {
    fn default() -> Self {
        Self::new(BSplineGrid::degenerate())
    }
}

impl<const D: usize> BSplineTransform<D> {
    /// Control points influencing a single point.
    pub const NUMBER_OF_WEIGHTS: usize = SUPPORT.pow(D as u32);

    /// Transform on `grid` with all displacements zero.
    pub fn new(grid: BSplineGrid<D>) -> Self {
        let parameters = vec![0.0; D * grid.number_of_nodes()];
        Self { grid, parameters }
    }

    /// Transform on `grid` with the given dimension-major displacements.
    pub fn with_parameters(grid: BSplineGrid<D>, parameters: Vec<f64>) -> Result<Self> {
        grid.validate()?;
        check_length("BSplineTransform::with_parameters", D * grid.number_of_nodes(), parameters.len())?;
        Ok(Self { grid, parameters })
    }

    pub fn grid(&self) -> &BSplineGrid<D> {
        &self.grid
    }

    /// Dimension-major displacement coefficients.
    pub fn coefficients(&self) -> &[f64] {
        &self.parameters
    }

    /// Replace the grid and reset all displacements to zero.
    pub fn set_grid(&mut self, grid: BSplineGrid<D>) -> Result<()> {
        grid.validate()?;
        *self = Self::new(grid);
        Ok(())
    }

    fn support(&self, point: &Point<D>) -> Option<Support<D>> {
        let cindex = self.grid.continuous_index(point);
        let mut start = [0i64; D];
        let mut u = [0.0; D];
        for d in 0..D {
            if !cindex[d].is_finite() {
                return None;
            }
            let (s, frac) = kernel::support_start(cindex[d]);
            if s < 0 || s + SUPPORT as i64 > self.grid.region.size[d] as i64 {
                return None;
            }
            start[d] = s;
            u[d] = frac;
        }
        Some(Support { start, u })
    }

    /// Visit the supporting nodes of `support` as
    /// `(local offset, flat node index, per-axis offsets)`.
    fn for_each_node(&self, support: &Support<D>, mut visit: impl FnMut(usize, usize, &[usize; D])) {
        let strides = self.grid.strides();
        for k in 0..Self::NUMBER_OF_WEIGHTS {
            let mut rest = k;
            let offsets: [usize; D] = std::array::from_fn(|_| {
                let o = rest % SUPPORT;
                rest /= SUPPORT;
                o
            });
            let flat = (0..D)
                .map(|d| (support.start[d] as usize + offsets[d]) * strides[d])
                .sum();
            visit(k, flat, &offsets);
        }
    }

    fn weights(support: &Support<D>) -> [[f64; SUPPORT]; D] {
        std::array::from_fn(|d| kernel::weights(support.u[d]))
    }

    /// Coefficient table of shape `[N, D]`, node-major, for gathering.
    fn coefficient_table<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let n = self.grid.number_of_nodes();
        let mut table = vec![0.0f32; n * D];
        for d in 0..D {
            for node in 0..n {
                table[node * D + d] = self.parameters[d * n + node] as f32;
            }
        }
        Tensor::<B, 1>::from_data(TensorData::new(table, [n * D]), device).reshape([n, D])
    }
}

/// Absolute snapping distance for continuous indices evaluated in `f32`.
const TENSOR_INDEX_TOLERANCE: f32 = 1e-4;

/// Cubic basis on a `[Batch, 1]` tensor of fractional offsets.
fn basis_tensors<B: Backend>(u: Tensor<B, 2>) -> [Tensor<B, 2>; SUPPORT] {
    let u2 = u.clone() * u.clone();
    let u3 = u2.clone() * u.clone();
    let one_minus_u = u.clone().neg().add_scalar(1.0);

    let b0 = one_minus_u.clone() * one_minus_u.clone() * one_minus_u / 6.0;
    let b1 = (u3.clone().mul_scalar(3.0) - u2.clone().mul_scalar(6.0)).add_scalar(4.0) / 6.0;
    let b2 = (u3.clone().mul_scalar(-3.0) + u2.mul_scalar(3.0) + u.mul_scalar(3.0)).add_scalar(1.0) / 6.0;
    let b3 = u3 / 6.0;

    [b0, b1, b2, b3]
}

impl<B: Backend, const D: usize> Transform<B, D> for BSplineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let [batch, rank] = points.dims();
        check_length("transform_points", D, rank)?;
        if batch == 0 {
            return Ok(points);
        }
        let device = points.device();
        let row = |values: [f64; D]| {
            let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            Tensor::<B, 1>::from_data(TensorData::new(values, [D]), &device).reshape([1, D])
        };

        let grid = &self.grid;
        let start = row(std::array::from_fn(|d| {
            grid.origin[d] + grid.region.index[d] as f64 * grid.spacing[d]
        }));
        let spacing = row(std::array::from_fn(|d| grid.spacing[d]));
        let upper = row(std::array::from_fn(|d| grid.region.size[d] as f64 - 3.0));

        // Continuous index relative to the region start: [Batch, D]
        let cindex = (points.clone() - start) / spacing;
        // Snap onto nodes within single-precision noise, as the point path does.
        let nearest = cindex.clone().round();
        let on_node = (cindex.clone() - nearest.clone()).abs().lower_equal_elem(TENSOR_INDEX_TOLERANCE);
        let cindex = cindex.mask_where(on_node, nearest);
        let floor = cindex.clone().floor();
        let frac = cindex - floor.clone();

        // Valid iff 1 <= floor <= size - 3 on every axis: [Batch, 1]
        let lower_ok = floor.clone().greater_equal_elem(1.0).float();
        let upper_ok = (floor.clone() - upper).lower_equal_elem(0.0).float();
        let mask = (lower_ok + upper_ok)
            .sum_dim(1)
            .equal_elem(2.0 * D as f32)
            .float();

        let base: Tensor<B, 2, Int> = floor.int().sub_scalar(1);
        let basis: [[Tensor<B, 2>; SUPPORT]; D] =
            std::array::from_fn(|d| basis_tensors(frac.clone().slice([0..batch, d..d + 1])));
        let base_axes: [Tensor<B, 2, Int>; D] = std::array::from_fn(|d| base.clone().slice([0..batch, d..d + 1]));
        let strides = grid.strides();

        let k_total = Self::NUMBER_OF_WEIGHTS;
        let mut weights = Vec::with_capacity(k_total);
        let mut nodes = Vec::with_capacity(k_total);
        for k in 0..k_total {
            let mut rest = k;
            let mut weight = Tensor::<B, 2>::ones([batch, 1], &device);
            let mut node = Tensor::<B, 2, Int>::zeros([batch, 1], &device);
            for d in 0..D {
                let o = rest % SUPPORT;
                rest /= SUPPORT;
                weight = weight * basis[d][o].clone();
                // Out-of-region entries are masked out below; clamp keeps the gather in bounds.
                let index = base_axes[d]
                    .clone()
                    .add_scalar(o as i32)
                    .clamp(0, grid.region.size[d] as i32 - 1);
                node = node + index.mul_scalar(strides[d] as i32);
            }
            weights.push(weight);
            nodes.push(node);
        }

        let weights = Tensor::cat(weights, 1).reshape([batch, k_total, 1]);
        let nodes = Tensor::cat(nodes, 1).reshape([batch * k_total]);
        let coeffs = self
            .coefficient_table::<B>(&device)
            .select(0, nodes)
            .reshape([batch, k_total, D]);

        let displacement = (coeffs * weights).sum_dim(1).reshape([batch, D]);
        Ok(points + displacement * mask)
    }
}

impl<const D: usize> AdvancedTransform<D> for BSplineTransform<D> {
    fn name(&self) -> &'static str {
        "BSplineTransform"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn transform_point(&self, point: &Point<D>) -> Result<Point<D>> {
        let Some(support) = self.support(point) else {
            return Ok(*point);
        };
        let weights = Self::weights(&support);
        let n = self.grid.number_of_nodes();
        let mut displacement = [0.0; D];
        self.for_each_node(&support, |_, flat, offsets| {
            let w: f64 = (0..D).map(|d| weights[d][offsets[d]]).product();
            for (d, value) in displacement.iter_mut().enumerate() {
                *value += w * self.parameters[d * n + flat];
            }
        });
        Ok(Point::from_fn(|d| point[d] + displacement[d]))
    }

    fn jacobian(
        &self,
        point: &Point<D>,
        jacobian: &mut Jacobian,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        nonzero_indices.clear();
        let Some(support) = self.support(point) else {
            *jacobian = Jacobian::zeros(D, 0);
            return Ok(());
        };
        let weights = Self::weights(&support);
        let n = self.grid.number_of_nodes();
        let k_total = Self::NUMBER_OF_WEIGHTS;

        *jacobian = Jacobian::zeros(D, D * k_total);
        let mut flat_nodes = Vec::with_capacity(k_total);
        self.for_each_node(&support, |k, flat, offsets| {
            let w: f64 = (0..D).map(|d| weights[d][offsets[d]]).product();
            for d in 0..D {
                jacobian[(d, d * k_total + k)] = w;
            }
            flat_nodes.push(flat);
        });
        for d in 0..D {
            nonzero_indices.extend(flat_nodes.iter().map(|&flat| d * n + flat));
        }
        Ok(())
    }

    fn number_of_parameters(&self) -> usize {
        self.parameters.len()
    }

    fn number_of_nonzero_jacobian_indices(&self) -> usize {
        D * Self::NUMBER_OF_WEIGHTS
    }

    fn parameters(&self) -> Result<Vec<f64>> {
        Ok(self.parameters.clone())
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        check_length("set_parameters", self.parameters.len(), parameters.len())?;
        self.parameters.copy_from_slice(parameters);
        Ok(())
    }

    fn fixed_parameters(&self) -> Vec<f64> {
        self.grid.to_fixed_parameters()
    }

    /// Changing the node count resets the displacements to zero.
    fn set_fixed_parameters(&mut self, fixed_parameters: &[f64]) -> Result<()> {
        let grid = BSplineGrid::from_fixed_parameters(fixed_parameters)?;
        if grid.number_of_nodes() != self.grid.number_of_nodes() {
            self.parameters = vec![0.0; D * grid.number_of_nodes()];
        }
        self.grid = grid;
        Ok(())
    }

    fn create_another(&self) -> Box<dyn AdvancedTransform<D>> {
        Box::new(Self::default())
    }

    fn spatial_jacobian(&self, point: &Point<D>) -> Result<SpatialJacobian<D>> {
        let mut sj = SpatialJacobian::<D>::identity();
        let Some(support) = self.support(point) else {
            return Ok(sj);
        };
        let weights = Self::weights(&support);
        let derivatives: [[f64; SUPPORT]; D] = std::array::from_fn(|d| kernel::derivatives(support.u[d]));
        let n = self.grid.number_of_nodes();
        self.for_each_node(&support, |_, flat, offsets| {
            for e in 0..D {
                let dw: f64 = (0..D)
                    .map(|d| if d == e { derivatives[d][offsets[d]] } else { weights[d][offsets[d]] })
                    .product::<f64>()
                    / self.grid.spacing[e];
                for c in 0..D {
                    sj[(c, e)] += self.parameters[c * n + flat] * dw;
                }
            }
        });
        Ok(sj)
    }
}
