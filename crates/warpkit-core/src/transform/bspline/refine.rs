//! Resampling B-spline coefficients onto another control-point grid.
//!
//! Refinement samples the current deformation at every node of the target
//! grid (mirror boundary conditions around the source lattice), then turns
//! the samples into interpolating cubic B-spline coefficients with the
//! recursive prefilter of Unser et al.

use tracing::debug;

use super::kernel::{self, SUPPORT};
use super::{BSplineGrid, BSplineTransform};

/// Pole of the cubic B-spline prefilter.
const POLE: f64 = -0.267_949_192_431_122_7; // sqrt(3) - 2

/// Overall gain of the prefilter, `(1 - z)(1 - 1/z)`.
const GAIN: f64 = 6.0;

/// Truncation tolerance of the causal initialization.
const TOLERANCE: f64 = 1e-10;

impl<const D: usize> BSplineTransform<D> {
    /// Evaluate one displacement component of the spline at a continuous
    /// grid index, mirroring indices that leave the lattice.
    fn sample_component(&self, dimension: usize, cindex: &[f64; D]) -> f64 {
        let size = self.grid.size();
        let n = self.grid.number_of_nodes();
        let strides = self.grid.strides();
        let start_u: [(i64, f64); D] = std::array::from_fn(|d| kernel::support_start(cindex[d]));
        let weights: [[f64; SUPPORT]; D] = std::array::from_fn(|d| kernel::weights(start_u[d].1));

        let block = &self.parameters[dimension * n..(dimension + 1) * n];
        let mut value = 0.0;
        for k in 0..Self::NUMBER_OF_WEIGHTS {
            let mut rest = k;
            let mut w = 1.0;
            let mut flat = 0;
            for d in 0..D {
                let o = rest % SUPPORT;
                rest /= SUPPORT;
                w *= weights[d][o];
                flat += kernel::mirror_index(start_u[d].0 + o as i64, size[d]) * strides[d];
            }
            value += w * block[flat];
        }
        value
    }

    /// Coefficients on `target` reproducing this deformation.
    ///
    /// The returned vector is laid out like [`BSplineTransform::coefficients`]
    /// for `target`. The refined spline interpolates the current deformation
    /// exactly at the target nodes.
    pub fn refine(&self, target: &BSplineGrid<D>) -> Vec<f64> {
        let n = target.number_of_nodes();
        let mut refined = vec![0.0; D * n];

        for node in 0..n {
            let position = target.node_position(&target.node_index(node));
            let cindex = self.grid.continuous_index(&position);
            for d in 0..D {
                refined[d * n + node] = self.sample_component(d, &cindex);
            }
        }

        let size = target.size();
        for block in refined.chunks_exact_mut(n) {
            decompose_in_place(block, &size);
        }

        debug!(
            from = ?self.grid.size(),
            to = ?size,
            "Refined B-spline coefficients"
        );
        refined
    }
}

/// Convert samples on a lattice of shape `size` (axis 0 fastest) into cubic
/// B-spline coefficients, one axis at a time.
pub fn decompose_in_place(values: &mut [f64], size: &[usize]) {
    let total: usize = size.iter().product();
    if values.len() != total || total == 0 {
        return;
    }
    let mut stride = 1;
    let mut line = Vec::new();
    for &len in size {
        if len > 1 {
            let outer = stride * len;
            for base in (0..total).step_by(outer) {
                for offset in 0..stride {
                    let first = base + offset;
                    line.clear();
                    line.extend((0..len).map(|i| values[first + i * stride]));
                    prefilter(&mut line);
                    for (i, &v) in line.iter().enumerate() {
                        values[first + i * stride] = v;
                    }
                }
            }
        }
        stride *= len;
    }
}

/// In-place cubic prefilter of one line with mirror boundaries.
fn prefilter(line: &mut [f64]) {
    let n = line.len();
    if n < 2 {
        return;
    }
    for v in line.iter_mut() {
        *v *= GAIN;
    }

    line[0] = initial_causal(line);
    for k in 1..n {
        line[k] += POLE * line[k - 1];
    }

    line[n - 1] = initial_anticausal(line);
    for k in (0..n - 1).rev() {
        line[k] = POLE * (line[k + 1] - line[k]);
    }
}

fn initial_causal(line: &[f64]) -> f64 {
    let n = line.len();
    let horizon = (TOLERANCE.ln() / POLE.abs().ln()).ceil() as usize;

    if horizon < n {
        // Truncated sum
        let mut zn = POLE;
        let mut sum = line[0];
        for &v in &line[1..horizon] {
            sum += zn * v;
            zn *= POLE;
        }
        sum
    } else {
        // Exact mirror-symmetric sum
        let iz = 1.0 / POLE;
        let mut zn = POLE;
        let mut z2n = POLE.powi(n as i32 - 1);
        let mut sum = line[0] + z2n * line[n - 1];
        z2n *= z2n * iz;
        for &v in &line[1..n - 1] {
            sum += (zn + z2n) * v;
            zn *= POLE;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

fn initial_anticausal(line: &[f64]) -> f64 {
    let n = line.len();
    (POLE / (POLE * POLE - 1.0)) * (POLE * line[n - 2] + line[n - 1])
}
