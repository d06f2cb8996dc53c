//! Scenario 1 (§8): `MatrixOperator`.

use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use linop_core::traits::{apply_vec, mul_into_scaled_vec, solve_vec, update_coefficients_vec};
use linop_core::{adjoint, LinearOperator, MatrixOperator, MatrixStorage, NO_PARAMS};

const N: usize = 8;

fn rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

#[test]
fn apply_matches_dense_product() {
    let mut r = rng();
    let a: Array2<f64> = Array2::random_using((N, N), Uniform::new(-1.0, 1.0), &mut r);
    let u = ndarray::Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let l = MatrixOperator::new(a.clone());
    let v = apply_vec(&l, u.view()).unwrap();
    let expected = a.dot(&u);
    assert_abs_diff_eq!(v, expected, epsilon = 1e-10);
}

#[test]
fn solve_matches_dense_solve() {
    use ndarray_linalg::Solve;
    let mut r = rng();
    let a: Array2<f64> = Array2::random_using((N, N), Uniform::new(-1.0, 1.0), &mut r)
        + Array2::eye(N) * (N as f64);
    let u = ndarray::Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let l = MatrixOperator::new(a.clone());
    let x = solve_vec(&l, u.view()).unwrap();
    let expected = a.solve(&u).unwrap();
    assert_abs_diff_eq!(x, expected, epsilon = 1e-8);
}

#[test]
fn adjoint_is_matrix_operator_over_conjugate_transpose() {
    let mut r = rng();
    let a: Array2<f64> = Array2::random_using((N, N), Uniform::new(-1.0, 1.0), &mut r);
    let l: Rc<dyn LinearOperator<f64>> = Rc::new(MatrixOperator::new(a.clone()));
    let adj = adjoint(l);
    let dense = adj.to_dense().unwrap().unwrap();
    assert_abs_diff_eq!(dense, a.t().to_owned(), epsilon = 1e-10);
}

#[test]
fn scaled_mul_matches_alpha_beta_form() {
    let mut r = rng();
    let a: Array2<f64> = Array2::random_using((N, N), Uniform::new(-1.0, 1.0), &mut r);
    let u = ndarray::Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);
    let w = ndarray::Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let l = MatrixOperator::new(a.clone());
    let alpha = 2.0;
    let beta = -0.5;
    let mut v = w.clone();
    mul_into_scaled_vec(&l, &mut v.view_mut(), u.view(), alpha, beta).unwrap();

    let expected = a.dot(&u) * alpha + &w * beta;
    assert_abs_diff_eq!(v, expected, epsilon = 1e-10);
}

#[test]
fn update_hook_rewrites_storage() {
    let a = Array2::<f64>::zeros((N, N));
    let l = MatrixOperator::new(a).with_update_hook(Rc::new(
        |storage: &mut MatrixStorage<f64>, _u, _p, t: f64| {
            if let MatrixStorage::Dense(m) = storage {
                m.fill(t);
            }
        },
    ));
    let u = ndarray::Array1::<f64>::zeros(N);
    update_coefficients_vec(&l, u.view(), &NO_PARAMS, 3.0).unwrap();
    let dense = l.to_dense().unwrap().unwrap();
    assert_abs_diff_eq!(dense, Array2::from_elem((N, N), 3.0), epsilon = 1e-12);
}
