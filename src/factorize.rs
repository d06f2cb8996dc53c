//! Factorization entry points (§6): `factorize`, `lu`, `qr`, `cholesky`,
//! `ldlt`, `bunchkaufman`, `lq`, `svd`. Each materializes its argument to a
//! dense matrix (via `to_dense`, an external-collaborator operation
//! delegated to `ndarray-linalg`) and wraps the resulting factorization in
//! an [`InvertibleOperator`].

use ndarray::{Array1, Array2};
use ndarray_linalg::{Cholesky, Lapack, Scalar, SVD, QR, UPLO};

use crate::error::{OperatorError, Result};
use crate::invertible_operator::InvertibleOperator;
use crate::traits::LinearOperator;
use crate::types::Size;

/// The concrete decomposition backing an [`InvertibleOperator`].
pub enum Factorization<T: Scalar> {
    Lu {
        a: Array2<T>,
    },
    Qr {
        q: Array2<T>,
        r: Array2<T>,
    },
    Cholesky {
        u: Array2<T>,
    },
    Svd {
        u: Array2<T>,
        s: Array1<T::Real>,
        vt: Array2<T>,
    },
    /// Unpivoted `A = L D L^T`. Reliable only for well-conditioned
    /// symmetric matrices; documented here (rather than silently assumed)
    /// as a simplification versus full LAPACK Bunch-Kaufman pivoting.
    Ldlt {
        l: Array2<T>,
        d: Array1<T>,
    },
    Lq {
        l: Array2<T>,
        q: Array2<T>,
    },
}

fn materialize<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<(Array2<T>, Size)> {
    let size = op.size();
    let dense = op
        .to_dense()
        .ok_or_else(|| OperatorError::missing_attribute(op.variant_name(), "to_dense"))??;
    Ok((dense, size))
}

/// `factorize(L)`: the default factorization (LU).
pub fn factorize<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    lu(op)
}

pub fn lu<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    log::debug!("factorizing {} via LU", op.variant_name());
    let (a, size) = materialize(op)?;
    if size.0 != size.1 {
        return Err(OperatorError::not_square(op.variant_name(), size));
    }
    Ok(InvertibleOperator::new(Factorization::Lu { a }, size))
}

pub fn qr<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    log::debug!("factorizing {} via QR", op.variant_name());
    let (a, size) = materialize(op)?;
    let (q, r) = a.qr()?;
    Ok(InvertibleOperator::new(Factorization::Qr { q, r }, size))
}

pub fn cholesky<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    log::debug!("factorizing {} via Cholesky", op.variant_name());
    let (a, size) = materialize(op)?;
    if size.0 != size.1 {
        return Err(OperatorError::not_square(op.variant_name(), size));
    }
    let u = a.cholesky(UPLO::Upper)?;
    Ok(InvertibleOperator::new(Factorization::Cholesky { u }, size))
}

pub fn svd<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    log::debug!("factorizing {} via SVD", op.variant_name());
    let (a, size) = materialize(op)?;
    let (u, s, vt) = a.svd(true, true)?;
    let u = u.ok_or_else(|| OperatorError::missing_attribute(op.variant_name(), "svd.u"))?;
    let vt = vt.ok_or_else(|| OperatorError::missing_attribute(op.variant_name(), "svd.vt"))?;
    Ok(InvertibleOperator::new(Factorization::Svd { u, s, vt }, size))
}

/// Unpivoted `LDL^T` of a symmetric matrix, computed by a Cholesky-Crout
/// recursion without the square root. See [`Factorization::Ldlt`].
pub fn ldlt<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    log::debug!("factorizing {} via unpivoted LDL^T", op.variant_name());
    let (a, size) = materialize(op)?;
    if size.0 != size.1 {
        return Err(OperatorError::not_square(op.variant_name(), size));
    }
    let n = size.0;
    let mut l = Array2::<T>::eye(n);
    let mut d = Array1::<T>::zeros(n);
    for j in 0..n {
        let mut sum = a[(j, j)];
        for k in 0..j {
            sum = sum - l[(j, k)] * l[(j, k)].conj() * d[k];
        }
        d[j] = sum;
        for i in (j + 1)..n {
            let mut sum = a[(i, j)];
            for k in 0..j {
                sum = sum - l[(i, k)] * l[(j, k)].conj() * d[k];
            }
            l[(i, j)] = sum / d[j];
        }
    }
    Ok(InvertibleOperator::new(Factorization::Ldlt { l, d }, size))
}

/// Symmetric indefinite factorization entry point. This crate does not
/// implement LAPACK's full Bunch-Kaufman 2x2-pivoting; it delegates to the
/// same unpivoted `LDL^T` as [`ldlt`]. Kept as a distinct entry point so
/// callers migrating from a Bunch-Kaufman-aware backend keep a stable name.
pub fn bunchkaufman<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    ldlt(op)
}

/// `A = L Q`, computed via the QR decomposition of `A^T`: if `A^T = Q_t
/// R_t` then `A = R_t^T Q_t^T`, so `L = R_t^T` and `Q = Q_t^T`.
pub fn lq<T: Scalar + Lapack + 'static>(
    op: &dyn LinearOperator<T>,
) -> Result<InvertibleOperator<T>> {
    log::debug!("factorizing {} via LQ", op.variant_name());
    let (a, size) = materialize(op)?;
    let (qt, rt) = a.t().to_owned().qr()?;
    let l = rt.t().to_owned();
    let q = qt.t().to_owned();
    Ok(InvertibleOperator::new(Factorization::Lq { l, q }, size))
}
