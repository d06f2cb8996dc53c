//! Scenarios 4 and 5 (§8): `FunctionOperator`, out-of-place and in-place.

use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use ndarray_linalg::Solve;
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use linop_core::traits::{apply_vec, cache_operator_vec, mul_into_scaled_vec, mul_into_vec, solve_vec};
use linop_core::{adjoint, FunctionOperator, LinearOperator};

const N: usize = 8;

fn symmetric(r: &mut StdRng) -> Array2<f64> {
    let m = Array2::random_using((N, N), Uniform::new(-1.0, 1.0), r);
    let s = &m + &m.t();
    s + Array2::eye(N) * (N as f64)
}

// --- Scenario 4: out-of-place ------------------------------------------------

#[test]
fn out_of_place_self_adjoint_short_circuits() {
    let mut r = StdRng::seed_from_u64(0);
    let a = symmetric(&mut r);

    let a_fwd = a.clone();
    let a_inv = a.clone();
    let l: Rc<dyn LinearOperator<f64>> = Rc::new(
        FunctionOperator::out_of_place((N, N), (), move |u, _p: &(), _t| Ok(a_fwd.dot(&u)))
            .with_inverse_out_of_place(move |u, _p: &(), _t| {
                let mut out = Array2::zeros(u.raw_dim());
                for (mut out_col, in_col) in out.columns_mut().into_iter().zip(u.columns()) {
                    out_col.assign(&a_inv.solve(&in_col).unwrap());
                }
                Ok(out)
            })
            .symmetric()
            .hermitian(),
    );

    assert!(l.has_mul());
    assert!(!l.has_mul_inplace());
    assert!(l.has_ldiv());
    assert!(!l.has_ldiv_inplace());

    let l_adj = adjoint(Rc::clone(&l));
    assert!(Rc::ptr_eq(&l, &l_adj));
}

#[test]
fn out_of_place_apply_and_solve_match_dense() {
    let mut r = StdRng::seed_from_u64(0);
    let a = symmetric(&mut r);
    let u: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let a_fwd = a.clone();
    let a_inv = a.clone();
    let l = FunctionOperator::out_of_place((N, N), (), move |u, _p: &(), _t| Ok(a_fwd.dot(&u)))
        .with_inverse_out_of_place(move |u, _p: &(), _t| {
            let mut out = Array2::zeros(u.raw_dim());
            for (mut out_col, in_col) in out.columns_mut().into_iter().zip(u.columns()) {
                out_col.assign(&a_inv.solve(&in_col).unwrap());
            }
            Ok(out)
        });

    let v = apply_vec(&l, u.view()).unwrap();
    assert_abs_diff_eq!(v, a.dot(&u), epsilon = 1e-10);

    let x = solve_vec(&l, u.view()).unwrap();
    let expected = a.solve(&u).unwrap();
    assert_abs_diff_eq!(x, expected, epsilon = 1e-8);
}

// --- Scenario 5: in-place -----------------------------------------------------

#[test]
fn in_place_mul_and_ldiv_match_dense_after_caching() {
    let mut r = StdRng::seed_from_u64(0);
    let a = symmetric(&mut r);
    let u: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);
    let w: Array1<f64> = Array1::random_using(N, Uniform::new(-1.0, 1.0), &mut r);

    let a_fwd = a.clone();
    let a_inv = a.clone();
    let l = FunctionOperator::in_place((N, N), (), move |v, u, _p: &(), _t| {
        v.assign(&a_fwd.dot(&u));
        Ok(())
    })
    .with_inverse_in_place(move |v, u, _p: &(), _t| {
        for (mut out_col, in_col) in v.columns_mut().into_iter().zip(u.columns()) {
            out_col.assign(&a_inv.solve(&in_col).unwrap());
        }
        Ok(())
    });

    cache_operator_vec(&l, u.view()).unwrap();
    assert!(l.is_cached());

    let mut v = w.clone();
    mul_into_vec(&l, &mut v.view_mut(), u.view()).unwrap();
    assert_abs_diff_eq!(v, a.dot(&u), epsilon = 1e-10);

    let alpha = 2.0;
    let beta = 0.5;
    let mut v2 = w.clone();
    mul_into_scaled_vec(&l, &mut v2.view_mut(), u.view(), alpha, beta).unwrap();
    let expected = alpha * a.dot(&u) + beta * &w;
    assert_abs_diff_eq!(v2, expected, epsilon = 1e-10);

    let mut xv = w.clone();
    linop_core::traits::ldiv_into_vec(&l, &mut xv.view_mut(), u.view()).unwrap();
    let expected_x = a.solve(&u).unwrap();
    assert_abs_diff_eq!(xv, expected_x, epsilon = 1e-8);
}
