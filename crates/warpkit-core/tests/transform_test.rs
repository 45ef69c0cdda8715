use burn_ndarray::NdArray;
use warpkit_core::spatial::{Point, Spacing, Vector};
use warpkit_core::transform::{
    create_transform, points_from_tensor, points_to_tensor, AdvancedTransform, BSplineGrid, BSplineTransform,
    Capability, Jacobian, Transform, TranslationTransform,
};

type Backend = NdArray<f32>;

fn smooth_bspline_3d() -> BSplineTransform<3> {
    let grid = BSplineGrid::new([6, 5, 5], Point::new([-4.0, -4.0, -4.0]), Spacing::new([4.0, 5.0, 5.0]));
    let n = grid.number_of_nodes();
    let parameters = (0..3 * n)
        .map(|i| ((i % 17) as f64 - 8.0) * 0.05)
        .collect();
    BSplineTransform::with_parameters(grid, parameters).unwrap()
}

#[test]
fn test_bspline_3d_tensor_path_matches_points() {
    let device = Default::default();
    let transform = smooth_bspline_3d();
    let points: Vec<Point<3>> = (0..40)
        .map(|k| {
            let t = k as f64;
            Point::new([-6.0 + 0.7 * t, -3.1 + 0.5 * t, 12.0 - 0.4 * t])
        })
        .collect();

    let tensor = points_to_tensor::<Backend, 3>(&points, &device);
    let mapped = points_from_tensor::<Backend, 3>(transform.transform_points(tensor).unwrap()).unwrap();
    for (p, q) in points.iter().zip(&mapped) {
        let expected = transform.transform_point(p).unwrap();
        for d in 0..3 {
            assert!(
                (expected[d] - q[d]).abs() < 1e-3,
                "{p:?}: expected {expected:?}, got {q:?}"
            );
        }
    }
}

#[test]
fn test_bspline_jacobian_predicts_parameter_change() {
    let mut transform = smooth_bspline_3d();
    let point = Point::new([3.0, 6.0, 4.5]);
    let mut jacobian = Jacobian::zeros(0, 0);
    let mut indices = Vec::new();
    transform.jacobian(&point, &mut jacobian, &mut indices).unwrap();
    assert_eq!(indices.len(), 3 * 64);

    let before = transform.transform_point(&point).unwrap();
    let mut parameters = transform.parameters().unwrap();
    let step = 0.25;
    parameters[indices[70]] += step;
    transform.set_parameters(&parameters).unwrap();
    let after = transform.transform_point(&point).unwrap();

    for d in 0..3 {
        let predicted = jacobian[(d, 70)] * step;
        assert!((after[d] - before[d] - predicted).abs() < 1e-12);
    }
}

#[test]
fn test_clone_transform_preserves_type_and_state() {
    let transform = smooth_bspline_3d();
    let copy = transform.clone_transform().unwrap();
    assert_eq!(copy.name(), "BSplineTransform");
    assert_eq!(copy.fixed_parameters(), transform.fixed_parameters());
    assert_eq!(copy.parameters().unwrap(), transform.parameters().unwrap());

    let p = Point::new([1.0, 2.0, 3.0]);
    assert_eq!(copy.transform_point(&p).unwrap(), transform.transform_point(&p).unwrap());
}

#[test]
fn test_capabilities_are_honoured() {
    for name in ["TranslationTransform", "AffineTransform", "BSplineTransform"] {
        let transform = create_transform::<2>(name).unwrap();
        let p = Point::new([1.0, 1.0]);
        assert_eq!(
            transform.supports(Capability::SpatialJacobian),
            transform.spatial_jacobian(&p).is_ok(),
            "{name}"
        );
        assert_eq!(
            transform.supports(Capability::VectorTransform),
            transform.transform_vector(&Vector::new([1.0, 0.0])).is_ok(),
            "{name}"
        );
    }
}

#[test]
fn test_translation_through_factory_and_tensor() {
    let device = Default::default();
    let mut transform = TranslationTransform::<2>::default();
    transform.set_parameters(&[1.5, -2.0]).unwrap();
    let tensor = points_to_tensor::<Backend, 2>(&[Point::new([0.0, 0.0]), Point::new([1.0, 1.0])], &device);
    let mapped = points_from_tensor::<Backend, 2>(transform.transform_points(tensor).unwrap()).unwrap();
    assert_eq!(mapped, vec![Point::new([1.5, -2.0]), Point::new([2.5, -1.0])]);
}
