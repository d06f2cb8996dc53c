//! Scenario 3 (§8): `AffineOperator`.

use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ndarray::Array1;
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use linop_core::traits::{apply_vec, ldiv_into_self_vec, solve_vec};
use linop_core::{AffineOperator, MatrixOperator};

const N: usize = 8;

#[test]
fn apply_is_linear_part_plus_offset() {
    let mut r = StdRng::seed_from_u64(0);
    let d: Array1<f64> = Array1::random_using(N, Uniform::new(0.5, 2.0), &mut r);
    let b: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);
    let u: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let d_op = Rc::new(MatrixOperator::diagonal(d.clone()));
    let l = AffineOperator::new(d_op, b.clone()).unwrap();

    let v = apply_vec(&l, u.view()).unwrap();
    let expected = &d * &u + &b;
    assert_abs_diff_eq!(v, expected, epsilon = 1e-10);
}

#[test]
fn solve_undoes_the_offset_then_the_linear_part() {
    let mut r = StdRng::seed_from_u64(0);
    let d: Array1<f64> = Array1::random_using(N, Uniform::new(0.5, 2.0), &mut r);
    let b: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);
    let u: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let d_op = Rc::new(MatrixOperator::diagonal(d.clone()));
    let l = AffineOperator::new(d_op, b.clone()).unwrap();

    let x = solve_vec(&l, u.view()).unwrap();
    let expected = (&u - &b) / &d;
    assert_abs_diff_eq!(x, expected, epsilon = 1e-10);
}

#[test]
fn ldiv_into_self_matches_solve() {
    let mut r = StdRng::seed_from_u64(0);
    let d: Array1<f64> = Array1::random_using(N, Uniform::new(0.5, 2.0), &mut r);
    let b: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);
    let u0: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let d_op = Rc::new(MatrixOperator::diagonal(d.clone()));
    let l = AffineOperator::new(d_op, b.clone()).unwrap();

    let expected = (&u0 - &b) / &d;
    let mut u = u0;
    ldiv_into_self_vec(&l, &mut u.view_mut()).unwrap();
    assert_abs_diff_eq!(u, expected, epsilon = 1e-10);
}
