//! `InvertibleOperator` (§4.2): wraps a factorization, adds `solve`.

use std::any::Any;
use std::cell::Cell;

use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use ndarray_linalg::{Lapack, OperationNorm, Scalar, Solve};
use num_traits::{Float, One};

use crate::error::{OperatorError, Result};
use crate::factorize::Factorization;
use crate::traits::LinearOperator;
use crate::types::Size;

pub struct InvertibleOperator<T: Scalar> {
    factorization: Factorization<T>,
    size: Size,
    success: Cell<bool>,
}

impl<T: Scalar + Lapack> InvertibleOperator<T> {
    pub fn new(factorization: Factorization<T>, size: Size) -> Self {
        InvertibleOperator {
            factorization,
            size,
            success: Cell::new(true),
        }
    }

    /// Post-hoc query for whether the backing factorization succeeded
    /// (§7: "`is_success(L)` on an `InvertibleOperator` queries success
    /// post-hoc").
    pub fn is_success(&self) -> bool {
        self.success.get()
    }

    fn solve_one(&self, b: ndarray::ArrayView1<T>) -> Result<ndarray::Array1<T>> {
        match &self.factorization {
            Factorization::Lu { a } => Ok(a.solve(&b)?),
            Factorization::Cholesky { u } => {
                // A = U^H U; solve U^H y = b then U x = y.
                let y = forward_solve_upper_transposed(u, &b);
                Ok(backward_solve_upper(u, &y))
            }
            Factorization::Qr { q, r } => {
                let qt_b = q.t().map(|x| x.conj()).dot(&b);
                Ok(backward_solve_upper(r, &qt_b))
            }
            Factorization::Svd { u, s, vt } => {
                let ut_b = u.t().map(|x| x.conj()).dot(&b);
                let scaled = ndarray::Zip::from(&ut_b)
                    .and(s)
                    .map_collect(|&x, &si| if si.abs() > T::Real::epsilon() { x / T::from_real(si) } else { T::zero() });
                Ok(vt.t().map(|x| x.conj()).dot(&scaled))
            }
            Factorization::Ldlt { l, d } => {
                let y = forward_solve_unit_lower(l, &b);
                let z = ndarray::Zip::from(&y).and(d).map_collect(|&yi, &di| yi / di);
                Ok(backward_solve_unit_lower_transposed(l, &z))
            }
            Factorization::Lq { l, q } => {
                let y = forward_solve_lower(l, &b);
                Ok(q.t().map(|x| x.conj()).dot(&y))
            }
        }
    }
}

fn forward_solve_upper_transposed<T: Scalar>(
    u: &Array2<T>,
    b: &ndarray::Array1<T>,
) -> ndarray::Array1<T> {
    // Solves U^H y = b where U is upper triangular, i.e. U^H is lower
    // triangular with conjugated entries.
    let n = u.nrows();
    let mut y = ndarray::Array1::<T>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum = sum - u[(k, i)].conj() * y[k];
        }
        y[i] = sum / u[(i, i)].conj();
    }
    y
}

fn backward_solve_upper<T: Scalar>(u: &Array2<T>, b: &ndarray::Array1<T>) -> ndarray::Array1<T> {
    let n = u.nrows();
    let mut x = ndarray::Array1::<T>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for k in (i + 1)..n {
            sum = sum - u[(i, k)] * x[k];
        }
        x[i] = sum / u[(i, i)];
    }
    x
}

fn forward_solve_lower<T: Scalar>(l: &Array2<T>, b: &ndarray::Array1<T>) -> ndarray::Array1<T> {
    let n = l.nrows();
    let mut x = ndarray::Array1::<T>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum = sum - l[(i, k)] * x[k];
        }
        x[i] = sum / l[(i, i)];
    }
    x
}

fn forward_solve_unit_lower<T: Scalar>(l: &Array2<T>, b: &ndarray::Array1<T>) -> ndarray::Array1<T> {
    let n = l.nrows();
    let mut y = ndarray::Array1::<T>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum = sum - l[(i, k)] * y[k];
        }
        y[i] = sum;
    }
    y
}

fn backward_solve_unit_lower_transposed<T: Scalar>(
    l: &Array2<T>,
    b: &ndarray::Array1<T>,
) -> ndarray::Array1<T> {
    let n = l.nrows();
    let mut x = ndarray::Array1::<T>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for k in (i + 1)..n {
            sum = sum - l[(k, i)].conj() * x[k];
        }
        x[i] = sum;
    }
    x
}

impl<T: Scalar + Lapack> LinearOperator<T> for InvertibleOperator<T> {
    fn variant_name(&self) -> &'static str {
        "InvertibleOperator"
    }

    fn size(&self) -> Size {
        self.size
    }

    fn has_mul(&self) -> bool {
        false
    }

    fn has_ldiv(&self) -> bool {
        true
    }

    fn has_ldiv_inplace(&self) -> bool {
        true
    }

    fn has_adjoint(&self) -> bool {
        false
    }

    fn apply(&self, _u: ArrayView2<T>) -> Result<Array2<T>> {
        Err(OperatorError::unsupported(
            "apply",
            self.variant_name(),
            self.size(),
        ))
    }

    fn solve(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        log::trace!("InvertibleOperator::solve on {:?}", self.size());
        if !self.is_square() {
            return Err(OperatorError::not_square(self.variant_name(), self.size()));
        }
        let mut out = Array2::zeros(u.raw_dim());
        for (mut out_col, in_col) in out.columns_mut().into_iter().zip(u.columns()) {
            match self.solve_one(in_col) {
                Ok(x) => out_col.assign(&x),
                Err(e) => {
                    self.success.set(false);
                    log::warn!("InvertibleOperator solve failed on {:?}: {e}", self.size());
                    return Err(e);
                }
            }
        }
        Ok(out)
    }

    fn ldiv_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        let result = self.solve(u)?;
        v.assign(&result);
        Ok(())
    }

    fn ldiv_into_self(&self, u: &mut ArrayViewMut2<T>) -> Result<()> {
        let result = self.solve(u.view())?;
        u.assign(&result);
        Ok(())
    }

    fn update_coefficients(&self, _u: ArrayView2<T>, _p: &dyn Any, _t: T) -> Result<()> {
        // A factorization is frozen at construction time; re-factorize via
        // `factorize(...)` again rather than mutating in place.
        Ok(())
    }

    fn to_dense(&self) -> Option<Result<Array2<T>>> {
        Some(Ok(match &self.factorization {
            Factorization::Lu { a } => a.clone(),
            Factorization::Qr { q, r } => q.dot(r),
            Factorization::Cholesky { u } => u.t().map(|x| x.conj()).dot(u),
            Factorization::Svd { u, s, vt } => {
                let mut sigma = Array2::zeros((s.len(), s.len()));
                for (i, &si) in s.iter().enumerate() {
                    sigma[(i, i)] = T::from_real(si);
                }
                u.dot(&sigma).dot(vt)
            }
            Factorization::Ldlt { l, d } => {
                let mut dmat = Array2::zeros((d.len(), d.len()));
                for (i, &di) in d.iter().enumerate() {
                    dmat[(i, i)] = di;
                }
                l.dot(&dmat).dot(&l.t().map(|x| x.conj()))
            }
            Factorization::Lq { l, q } => l.dot(q),
        }))
    }
}

/// `opnorm(L, p) = 1 / opnorm(F, p)`, an optimistic upper bound for
/// condition-bounded solve error (§4.2). Requires the materialized matrix
/// to support `ndarray_linalg`'s `OperationNorm`.
pub fn invertible_opnorm<T: Scalar + Lapack>(
    op: &InvertibleOperator<T>,
    norm: ndarray_linalg::NormType,
) -> Result<T::Real> {
    let dense = op
        .to_dense()
        .expect("InvertibleOperator always materializes")?;
    Ok(T::Real::one() / dense.opnorm(norm)?)
}
