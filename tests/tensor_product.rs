//! Scenario 6 (§8): `TensorProductOperator`, the lazy Kronecker product.

use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use linop_core::convert::kron;
use linop_core::traits::{apply_vec, cache_operator_vec, mul_into_vec};
use linop_core::{LinearOperator, MatrixOperator, TensorProductOperator};

#[test]
fn dense_and_apply_match_kron_and_in_place_agrees() {
    let mut r = StdRng::seed_from_u64(0);
    let a = Array2::<f64>::random_using((3, 5), Uniform::new(-1.0, 1.0), &mut r);
    let b = Array2::<f64>::random_using((7, 11), Uniform::new(-1.0, 1.0), &mut r);
    let u = ndarray::Array1::<f64>::random_using(55, Uniform::new(-1.0, 1.0), &mut r);

    let expected_dense = kron(a.view(), b.view());

    let outer = Rc::new(MatrixOperator::new(a.clone()));
    let inner = Rc::new(MatrixOperator::new(b.clone()));
    let l = TensorProductOperator::new(outer, inner);

    let dense = l.to_dense().unwrap().unwrap();
    assert_abs_diff_eq!(dense, expected_dense, epsilon = 1e-10);

    let v = apply_vec(&l, u.view()).unwrap();
    let expected_v = expected_dense.dot(&u);
    assert_abs_diff_eq!(v, expected_v, epsilon = 1e-10);

    cache_operator_vec(&l, u.view()).unwrap();
    assert!(l.is_cached());
    let mut v2 = ndarray::Array1::<f64>::zeros(21);
    mul_into_vec(&l, &mut v2.view_mut(), u.view()).unwrap();
    assert_abs_diff_eq!(v2, expected_v, epsilon = 1e-10);
}

#[test]
fn square_factors_solve_matches_kron_solve() {
    use ndarray_linalg::Solve;

    let mut r = StdRng::seed_from_u64(0);
    let a = Array2::<f64>::random_using((4, 4), Uniform::new(-1.0, 1.0), &mut r) + Array2::eye(4) * 4.0;
    let b = Array2::<f64>::random_using((3, 3), Uniform::new(-1.0, 1.0), &mut r) + Array2::eye(3) * 3.0;
    let u = ndarray::Array1::<f64>::random_using(12, Uniform::new(-1.0, 1.0), &mut r);

    let outer = Rc::new(MatrixOperator::new(a.clone()));
    let inner = Rc::new(MatrixOperator::new(b.clone()));
    let l = TensorProductOperator::new(outer, inner);
    assert!(l.has_ldiv());

    let x = linop_core::traits::solve_vec(&l, u.view()).unwrap();
    let expected = kron(a.view(), b.view()).solve(&u).unwrap();
    assert_abs_diff_eq!(x, expected, epsilon = 1e-7);
}
