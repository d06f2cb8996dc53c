//! Scenario 2 (§8): `InvertibleOperator`.

use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use ndarray_linalg::Solve;
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use linop_core::traits::{adjoint, apply_vec, solve_vec};
use linop_core::{factorize, LinearOperator, MatrixOperator};

const N: usize = 8;

fn well_conditioned(r: &mut StdRng) -> Array2<f64> {
    Array2::random_using((N, N), Uniform::new(-1.0, 1.0), r) + Array2::eye(N) * (N as f64)
}

#[test]
fn factorize_materializes_back_to_the_source_matrix() {
    let mut r = StdRng::seed_from_u64(0);
    let a = well_conditioned(&mut r);
    let f = factorize(&MatrixOperator::new(a.clone())).unwrap();
    let dense = f.to_dense().unwrap().unwrap();
    assert_abs_diff_eq!(dense, a, epsilon = 1e-8);
}

#[test]
fn solve_matches_dense_solve() {
    let mut r = StdRng::seed_from_u64(0);
    let a = well_conditioned(&mut r);
    let u = ndarray::Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let f = factorize(&MatrixOperator::new(a.clone())).unwrap();
    let x = solve_vec(&f, u.view()).unwrap();
    let expected = a.solve(&u).unwrap();
    assert_abs_diff_eq!(x, expected, epsilon = 1e-7);
}

#[test]
fn adjoint_solve_matches_dense_adjoint_solve() {
    let mut r = StdRng::seed_from_u64(0);
    let a = well_conditioned(&mut r);
    let u = ndarray::Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let f: Rc<dyn LinearOperator<f64>> = Rc::new(factorize(&MatrixOperator::new(a.clone())).unwrap());
    let f_adj = adjoint(f);
    let x = solve_vec(&*f_adj, u.view()).unwrap();
    let expected = a.t().to_owned().solve(&u).unwrap();
    assert_abs_diff_eq!(x, expected, epsilon = 1e-7);
}

#[test]
fn apply_is_unsupported() {
    let mut r = StdRng::seed_from_u64(0);
    let a = well_conditioned(&mut r);
    let u = ndarray::Array1::<f64>::zeros(N);
    let f = factorize(&MatrixOperator::new(a)).unwrap();
    assert!(apply_vec(&f, u.view()).is_err());
}

#[test]
fn is_success_reports_failed_factorization_solve() {
    // A singular matrix factors fine under plain LU but fails at solve time.
    let a = Array2::<f64>::zeros((N, N));
    let f = factorize(&MatrixOperator::new(a)).unwrap();
    let u = ndarray::Array1::<f64>::zeros(N);
    assert!(solve_vec(&f, u.view()).is_err() || !f.is_success());
}
