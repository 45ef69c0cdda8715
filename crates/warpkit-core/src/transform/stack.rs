//! Stack transform implementation.
//!
//! This module provides a transform that treats the last axis of a `D`
//! dimensional space as a discrete stack of `R = D - 1` dimensional slices,
//! each mapped by its own sub-transform.
//!
//! T(x, s) = (T_i(x), s) with i = round((s - origin) / spacing)

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use tracing::debug;

use super::factory::create_transform;
use super::trait_::{
    check_length, transform_points_pointwise, AdvancedTransform, Capability, Jacobian, NonZeroJacobianIndices,
    Transform,
};
use crate::error::{Result, TransformError};
use crate::spatial::Point;

const CAPABILITIES: &[Capability] = &[Capability::PointTransform, Capability::Jacobian];

type Slot<const R: usize> = Option<Box<dyn AdvancedTransform<R>>>;

/// Stack Transform (one reduced-dimension transform per slice).
///
/// Every set slot owns its sub-transform exclusively. All set slots carry
/// the same number of parameters `L`; the stacked parameter vector is the
/// concatenation of the slot vectors, slot 0 first, so slot `i` owns indices
/// `i * L .. (i + 1) * L`.
///
/// # Type Parameters
/// * `D` - Dimensionality of the stacked space
/// * `R` - Dimensionality of each slice, always `D - 1`
#[derive(Debug)]
pub struct StackTransform<const D: usize, const R: usize> {
    slots: Vec<Slot<R>>,
    stack_origin: f64,
    stack_spacing: f64,
    modification_count: u64,
}

impl<const D: usize, const R: usize> Default for StackTransform<D, R> {
    fn default() -> Self {
        Self::new(0, 0.0, 1.0)
    }
}

impl<const D: usize, const R: usize> StackTransform<D, R> {
    const DIMENSION_CHECK: () = assert!(R + 1 == D, "stack slices must have exactly one dimension less");

    /// Create a stack with `count` empty slots.
    ///
    /// # Arguments
    /// * `count` - Number of slices
    /// * `stack_origin` - Stack coordinate of slice 0
    /// * `stack_spacing` - Distance between consecutive slices
    pub fn new(count: usize, stack_origin: f64, stack_spacing: f64) -> Self {
        let () = Self::DIMENSION_CHECK;
        Self {
            slots: std::iter::repeat_with(|| None).take(count).collect(),
            stack_origin,
            stack_spacing,
            modification_count: 0,
        }
    }

    pub fn number_of_sub_transforms(&self) -> usize {
        self.slots.len()
    }

    pub fn stack_origin(&self) -> f64 {
        self.stack_origin
    }

    pub fn stack_spacing(&self) -> f64 {
        self.stack_spacing
    }

    /// Incremented by every mutation of the stack or its slots.
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    fn modified(&mut self) {
        self.modification_count += 1;
    }

    pub fn set_stack_geometry(&mut self, stack_origin: f64, stack_spacing: f64) -> Result<()> {
        if !stack_origin.is_finite() || !(stack_spacing.is_finite() && stack_spacing > 0.0) {
            return Err(TransformError::invalid_configuration(format!(
                "stack origin must be finite and spacing positive, got origin {stack_origin}, spacing {stack_spacing}"
            )));
        }
        self.stack_origin = stack_origin;
        self.stack_spacing = stack_spacing;
        self.modified();
        Ok(())
    }

    /// Resize to `count` slots. Existing sub-transforms are dropped.
    pub fn set_number_of_sub_transforms(&mut self, count: usize) {
        debug!(from = self.slots.len(), to = count, "Resizing transform stack");
        self.slots.clear();
        self.slots.resize_with(count, || None);
        self.modified();
    }

    pub fn sub_transform(&self, index: usize) -> Option<&dyn AdvancedTransform<R>> {
        self.slots.get(index)?.as_deref()
    }

    /// Place `transform` in slot `index`, replacing any previous occupant.
    ///
    /// Fails if the index is out of range or if the transform's parameter
    /// count differs from the other occupied slots.
    pub fn set_sub_transform(&mut self, index: usize, transform: Box<dyn AdvancedTransform<R>>) -> Result<()> {
        let count = self.slots.len();
        if index >= count {
            return Err(TransformError::OutOfRangeIndex {
                operation: "set_sub_transform",
                coordinate: index as f64,
                index: index as i64,
                count,
            });
        }
        let established = self
            .slots
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .find_map(|(_, slot)| slot.as_ref())
            .map(|slot| slot.number_of_parameters());
        if let Some(expected) = established {
            check_length("set_sub_transform", expected, transform.number_of_parameters())?;
        }
        self.slots[index] = Some(transform);
        self.modified();
        Ok(())
    }

    /// Fill slot `index` with a default transform of the named type.
    pub fn set_sub_transform_by_name(&mut self, index: usize, name: &str) -> Result<()> {
        self.set_sub_transform(index, create_transform::<R>(name)?)
    }

    /// Deep-copy `template` into every slot.
    pub fn set_all_sub_transforms(&mut self, template: &dyn AdvancedTransform<R>) -> Result<()> {
        let copies = (0..self.slots.len())
            .map(|_| template.clone_transform().map(Some))
            .collect::<Result<Vec<_>>>()?;
        self.slots = copies;
        self.modified();
        Ok(())
    }

    /// Parameters per slice, taken from the first occupied slot.
    fn parameters_per_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .find_map(|slot| slot.as_ref())
            .map(|slot| slot.number_of_parameters())
    }

    fn occupied(&self, operation: &'static str, index: usize) -> Result<&dyn AdvancedTransform<R>> {
        self.slots
            .get(index)
            .and_then(|slot| slot.as_deref())
            .ok_or(TransformError::UninitializedSlot { operation, index })
    }

    /// Slot selected by the last coordinate of `point`.
    pub fn stack_index(&self, operation: &'static str, point: &Point<D>) -> Result<usize> {
        let coordinate = point[D - 1];
        let scaled = ((coordinate - self.stack_origin) / self.stack_spacing).round();
        let count = self.slots.len();
        if scaled.is_finite() && scaled >= 0.0 && scaled < count as f64 {
            Ok(scaled as usize)
        } else {
            Err(TransformError::OutOfRangeIndex {
                operation,
                coordinate,
                index: scaled as i64,
                count,
            })
        }
    }
}

impl<B: Backend, const D: usize, const R: usize> Transform<B, D> for StackTransform<D, R> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        transform_points_pointwise(self, points)
    }
}

impl<const D: usize, const R: usize> AdvancedTransform<D> for StackTransform<D, R> {
    fn name(&self) -> &'static str {
        "StackTransform"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn transform_point(&self, point: &Point<D>) -> Result<Point<D>> {
        let index = self.stack_index("transform_point", point)?;
        let mapped = self
            .occupied("transform_point", index)?
            .transform_point(&point.truncate::<R>())?;
        Ok(Point::extend(&mapped, point[D - 1]))
    }

    fn jacobian(
        &self,
        point: &Point<D>,
        jacobian: &mut Jacobian,
        nonzero_indices: &mut NonZeroJacobianIndices,
    ) -> Result<()> {
        let index = self.stack_index("jacobian", point)?;
        let sub = self.occupied("jacobian", index)?;

        let mut reduced = Jacobian::zeros(0, 0);
        sub.jacobian(&point.truncate::<R>(), &mut reduced, nonzero_indices)?;

        let columns = reduced.ncols();
        *jacobian = Jacobian::zeros(D, columns);
        jacobian.rows_mut(0, R).copy_from(&reduced);

        let offset = index * sub.number_of_parameters();
        for i in nonzero_indices.iter_mut() {
            *i += offset;
        }
        Ok(())
    }

    fn number_of_parameters(&self) -> usize {
        self.parameters_per_slot()
            .map_or(0, |per_slot| per_slot * self.slots.len())
    }

    fn number_of_nonzero_jacobian_indices(&self) -> usize {
        self.slots
            .iter()
            .find_map(|slot| slot.as_ref())
            .map_or(0, |slot| slot.number_of_nonzero_jacobian_indices())
    }

    fn parameters(&self) -> Result<Vec<f64>> {
        let mut parameters = Vec::with_capacity(self.number_of_parameters());
        for index in 0..self.slots.len() {
            parameters.extend(self.occupied("parameters", index)?.parameters()?);
        }
        Ok(parameters)
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            return Err(TransformError::UninitializedSlot {
                operation: "set_parameters",
                index,
            });
        }
        check_length("set_parameters", self.number_of_parameters(), parameters.len())?;

        let per_slot = self.parameters_per_slot().unwrap_or(0);
        if per_slot > 0 {
            for (slot, block) in self.slots.iter_mut().zip(parameters.chunks_exact(per_slot)) {
                if let Some(sub) = slot {
                    sub.set_parameters(block)?;
                }
            }
        }
        self.modified();
        Ok(())
    }

    /// `[stack_origin, stack_spacing, count]`.
    fn fixed_parameters(&self) -> Vec<f64> {
        vec![self.stack_origin, self.stack_spacing, self.slots.len() as f64]
    }

    fn set_fixed_parameters(&mut self, fixed_parameters: &[f64]) -> Result<()> {
        check_length("set_fixed_parameters", 3, fixed_parameters.len())?;
        let count = fixed_parameters[2];
        if !(count.is_finite() && count >= 0.0 && count.fract() == 0.0) {
            return Err(TransformError::invalid_configuration(format!(
                "number of sub-transforms must be a non-negative integer, got {count}"
            )));
        }
        self.set_stack_geometry(fixed_parameters[0], fixed_parameters[1])?;
        if count as usize != self.slots.len() {
            self.set_number_of_sub_transforms(count as usize);
        }
        Ok(())
    }

    fn create_another(&self) -> Box<dyn AdvancedTransform<D>> {
        Box::new(Self::default())
    }

    fn clone_transform(&self) -> Result<Box<dyn AdvancedTransform<D>>> {
        let slots = self
            .slots
            .iter()
            .map(|slot| slot.as_ref().map(|sub| sub.clone_transform()).transpose())
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(Self {
            slots,
            stack_origin: self.stack_origin,
            stack_spacing: self.stack_spacing,
            modification_count: 0,
        }))
    }
}
