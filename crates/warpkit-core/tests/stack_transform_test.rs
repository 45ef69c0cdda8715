use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use nalgebra::SMatrix;
use proptest::prelude::*;
use rayon::prelude::*;
use warpkit_core::spatial::{Point, Spacing, Vector};
use warpkit_core::transform::{
    points_from_tensor, points_to_tensor, AdvancedTransform, AffineTransform, BSplineGrid, BSplineTransform,
    Jacobian, StackTransform, Transform,
};
use warpkit_core::TransformError;

type Backend = NdArray<f32>;

const ORIGIN: f64 = -2.0;
const SPACING: f64 = 0.5;

fn affine(i: usize) -> AffineTransform<2> {
    let s = 1.0 + 0.1 * i as f64;
    AffineTransform::new(
        SMatrix::<f64, 2, 2>::new(s, 0.2, -0.1 * i as f64, s),
        Vector::new([i as f64, -(i as f64)]),
        Point::new([1.0, 1.0]),
    )
}

fn affine_stack(count: usize) -> StackTransform<3, 2> {
    let mut stack = StackTransform::new(count, ORIGIN, SPACING);
    for i in 0..count {
        stack.set_sub_transform(i, Box::new(affine(i))).unwrap();
    }
    stack
}

proptest! {
    #[test]
    fn test_point_routes_to_selected_slice(
        index in 0usize..4,
        x in -50.0f64..50.0,
        y in -50.0f64..50.0,
        jitter in -0.2f64..0.2
    ) {
        let stack = affine_stack(4);
        let s = ORIGIN + index as f64 * SPACING + jitter;
        let mapped = stack.transform_point(&Point::new([x, y, s])).unwrap();
        let expected = affine(index).transform_point(&Point::new([x, y])).unwrap();

        prop_assert_eq!(mapped[0], expected[0]);
        prop_assert_eq!(mapped[1], expected[1]);
        prop_assert_eq!(mapped[2], s);
    }

    #[test]
    fn test_parameters_round_trip(values in proptest::collection::vec(-10.0f64..10.0, 24)) {
        let mut stack = affine_stack(4);
        stack.set_parameters(&values).unwrap();
        prop_assert_eq!(stack.parameters().unwrap(), values.clone());
        for i in 0..4 {
            let block = stack.sub_transform(i).unwrap().parameters().unwrap();
            prop_assert_eq!(&block[..], &values[i * 6..(i + 1) * 6]);
        }
    }

    #[test]
    fn test_jacobian_is_block_sparse(index in 0usize..4, x in -5.0f64..5.0, y in -5.0f64..5.0) {
        let stack = affine_stack(4);
        let mut jacobian = Jacobian::zeros(0, 0);
        let mut indices = Vec::new();
        stack
            .jacobian(&Point::new([x, y, ORIGIN + index as f64 * SPACING]), &mut jacobian, &mut indices)
            .unwrap();

        let mut sub_jacobian = Jacobian::zeros(0, 0);
        let mut sub_indices = Vec::new();
        affine(index).jacobian(&Point::new([x, y]), &mut sub_jacobian, &mut sub_indices).unwrap();

        prop_assert_eq!(jacobian.shape(), (3, sub_jacobian.ncols()));
        prop_assert!(indices.iter().all(|&i| (index * 6..(index + 1) * 6).contains(&i)));
        for (col, (&global, &local)) in indices.iter().zip(&sub_indices).enumerate() {
            prop_assert_eq!(global, local + index * 6);
            prop_assert_eq!(jacobian[(0, col)], sub_jacobian[(0, col)]);
            prop_assert_eq!(jacobian[(1, col)], sub_jacobian[(1, col)]);
            prop_assert_eq!(jacobian[(2, col)], 0.0);
        }
    }
}

#[test]
fn test_four_affine_slices_have_24_parameters() {
    let mut stack = affine_stack(4);
    assert_eq!(stack.number_of_parameters(), 24);
    let err = stack.set_parameters(&[0.0; 20]).unwrap_err();
    assert!(matches!(
        err,
        TransformError::ConfigurationMismatch {
            operation: "set_parameters",
            actual: 20,
            ..
        }
    ));
    // Nothing was assigned.
    assert_eq!(stack.sub_transform(3).unwrap().parameters().unwrap(), affine(3).parameters().unwrap());
}

#[test]
fn test_empty_stack() {
    let mut stack = StackTransform::<3, 2>::default();
    assert_eq!(stack.number_of_parameters(), 0);
    assert!(stack.parameters().unwrap().is_empty());
    stack.set_parameters(&[]).unwrap();
    assert!(matches!(
        stack.transform_point(&Point::new([0.0, 0.0, 0.0])),
        Err(TransformError::OutOfRangeIndex { count: 0, .. })
    ));
}

#[test]
fn test_out_of_range_slices_are_reported() {
    let stack = affine_stack(4);
    let below = Point::new([0.0, 0.0, ORIGIN - SPACING]);
    let above = Point::new([0.0, 0.0, ORIGIN + 4.0 * SPACING]);
    for point in [below, above] {
        let err = stack.transform_point(&point).unwrap_err();
        assert!(matches!(err, TransformError::OutOfRangeIndex { .. }));
        let mut jacobian = Jacobian::zeros(0, 0);
        let mut indices = Vec::new();
        assert!(stack.jacobian(&point, &mut jacobian, &mut indices).is_err());
    }
}

#[test]
fn test_bspline_slices() {
    let grid = BSplineGrid::new([5, 5], Point::new([-10.0, -10.0]), Spacing::uniform(10.0));
    let template = BSplineTransform::with_parameters(grid, (0..50).map(|i| i as f64 * 0.01).collect()).unwrap();
    let mut stack = StackTransform::<3, 2>::new(3, 0.0, 1.0);
    stack.set_all_sub_transforms(&template).unwrap();

    assert_eq!(stack.number_of_parameters(), 150);
    assert_eq!(stack.number_of_nonzero_jacobian_indices(), 32);

    let point = Point::new([5.0, 7.0, 2.0]);
    let mut jacobian = Jacobian::zeros(0, 0);
    let mut indices = Vec::new();
    stack.jacobian(&point, &mut jacobian, &mut indices).unwrap();
    assert_eq!(indices.len(), 32);
    assert!(indices.iter().all(|&i| (100..150).contains(&i)));
}

#[test]
fn test_tensor_path_routes_each_row() {
    let device = Default::default();
    let stack = affine_stack(4);
    let points = vec![
        Point::new([1.0, 2.0, ORIGIN]),
        Point::new([-3.0, 0.5, ORIGIN + 3.0 * SPACING]),
        Point::new([0.0, 0.0, ORIGIN + SPACING]),
    ];
    let tensor = points_to_tensor::<Backend, 3>(&points, &device);
    let mapped = points_from_tensor::<Backend, 3>(stack.transform_points(tensor).unwrap()).unwrap();
    for (p, q) in points.iter().zip(&mapped) {
        let expected = stack.transform_point(p).unwrap();
        for d in 0..3 {
            assert!((expected[d] - q[d]).abs() < 1e-4);
        }
    }

    let outside = Tensor::<Backend, 2>::from_floats([[0.0, 0.0, 100.0]], &device);
    assert!(stack.transform_points(outside).is_err());
}

#[test]
fn test_concurrent_queries_match_sequential() {
    let stack = affine_stack(4);
    let points: Vec<Point<3>> = (0..2000)
        .map(|k| {
            let slice = k % 4;
            Point::new([k as f64 * 0.01, -(k as f64) * 0.02, ORIGIN + slice as f64 * SPACING])
        })
        .collect();

    let sequential: Vec<_> = points.iter().map(|p| stack.transform_point(p).unwrap()).collect();
    let parallel: Vec<_> = points.par_iter().map(|p| stack.transform_point(p).unwrap()).collect();
    assert_eq!(sequential, parallel);

    let jacobians: Vec<Vec<usize>> = points
        .par_iter()
        .map(|p| {
            let mut jacobian = Jacobian::zeros(0, 0);
            let mut indices = Vec::new();
            stack.jacobian(p, &mut jacobian, &mut indices).unwrap();
            indices
        })
        .collect();
    for (k, indices) in jacobians.iter().enumerate() {
        let slice = k % 4;
        assert!(indices.iter().all(|&i| i / 6 == slice));
    }
}
