//! The common operator interface (§4.0) and the capability trait system.
//!
//! Every concrete operator variant (`MatrixOperator`, `InvertibleOperator`,
//! `AffineOperator`, `FunctionOperator`, `TensorProductOperator`, the
//! adjoint/transpose wrappers) implements [`LinearOperator`]. The trait is
//! object-safe so heterogeneous sub-operators can be stored behind
//! `Rc<dyn LinearOperator<T>>` — this is the tagged-union/virtual-interface
//! replacement for the source's multiple-dispatch hierarchy called for in
//! the design notes.
//!
//! All apply/solve methods operate on `Ix2` views: a vector `u` is just a
//! matrix with one column. [`apply_vec`]/[`solve_vec`] and friends are thin
//! convenience wrappers for the common single-vector case.

use std::any::Any;
use std::rc::Rc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};

use crate::error::{OperatorError, Result};
use crate::types::{Scalar, Size};

/// Capability query + apply/solve interface shared by every operator
/// variant. Default-method bodies are the "unsupported" case; concrete
/// variants override only the capabilities they actually have.
pub trait LinearOperator<T: Scalar> {
    /// A short, stable name for diagnostics (`"MatrixOperator"`, ...).
    fn variant_name(&self) -> &'static str;

    /// Shape `(m, n)`: the operator maps `T^n -> T^m`.
    fn size(&self) -> Size;

    fn is_square(&self) -> bool {
        let (m, n) = self.size();
        m == n
    }

    // --- capability predicates (§6) -------------------------------------

    fn has_mul(&self) -> bool {
        true
    }
    fn has_mul_inplace(&self) -> bool {
        false
    }
    fn has_ldiv(&self) -> bool {
        false
    }
    fn has_ldiv_inplace(&self) -> bool {
        false
    }
    fn has_adjoint(&self) -> bool {
        false
    }
    fn is_constant(&self) -> bool {
        true
    }
    fn is_linear(&self) -> bool {
        true
    }
    fn is_zero(&self) -> bool {
        false
    }
    fn is_symmetric(&self) -> bool {
        false
    }
    fn is_hermitian(&self) -> bool {
        false
    }
    fn is_posdef(&self) -> bool {
        false
    }
    fn is_singular(&self) -> bool {
        false
    }

    /// True for the multiplicative identity, used by
    /// [`crate::tensor_product`]'s identity-collapse and identity-outer fast
    /// paths (§4.5).
    fn is_identity(&self) -> bool {
        false
    }

    /// An operator is its own adjoint iff it declares `hermitian`, or `T` is
    /// real and it declares `symmetric` (§3 invariants).
    fn is_self_adjoint(&self) -> bool {
        self.is_hermitian() || (!T::is_complex() && self.is_symmetric())
    }

    // --- apply / solve ----------------------------------------------------

    /// `v <- L . u`, freshly allocated.
    fn apply(&self, u: ArrayView2<T>) -> Result<Array2<T>>;

    /// `v <- L . u`, in place. Default: unsupported.
    fn mul_into(&self, _v: &mut ArrayViewMut2<T>, _u: ArrayView2<T>) -> Result<()> {
        Err(OperatorError::unsupported(
            "mul!",
            self.variant_name(),
            self.size(),
        ))
    }

    /// `v <- alpha * (L . u) + beta * v`, in place. Default: unsupported.
    fn mul_into_scaled(
        &self,
        _v: &mut ArrayViewMut2<T>,
        _u: ArrayView2<T>,
        _alpha: T,
        _beta: T,
    ) -> Result<()> {
        Err(OperatorError::unsupported(
            "mul!(v,L,u,a,b)",
            self.variant_name(),
            self.size(),
        ))
    }

    /// `v <- L^-1 . u`, freshly allocated. Default: unsupported.
    fn solve(&self, _u: ArrayView2<T>) -> Result<Array2<T>> {
        Err(OperatorError::unsupported(
            "solve",
            self.variant_name(),
            self.size(),
        ))
    }

    /// `v <- L^-1 . u`, in place. Default: unsupported.
    fn ldiv_into(&self, _v: &mut ArrayViewMut2<T>, _u: ArrayView2<T>) -> Result<()> {
        Err(OperatorError::unsupported(
            "ldiv!",
            self.variant_name(),
            self.size(),
        ))
    }

    /// `u <- L^-1 . u`, in place, overwriting the input. Default:
    /// unsupported.
    fn ldiv_into_self(&self, _u: &mut ArrayViewMut2<T>) -> Result<()> {
        Err(OperatorError::unsupported(
            "ldiv!(L,u)",
            self.variant_name(),
            self.size(),
        ))
    }

    // --- update hook / caching --------------------------------------------

    /// Refresh internal coefficients for new `(u, p, t)`. No-op by default
    /// (a constant operator).
    fn update_coefficients(&self, _u: ArrayView2<T>, _p: &dyn Any, _t: T) -> Result<()> {
        Ok(())
    }

    /// Allocate workspace sized for a representative `u`. No-op by default
    /// (operators that need no workspace are always "cached").
    fn cache_operator(&self, _u: ArrayView2<T>) -> Result<()> {
        Ok(())
    }

    fn is_cached(&self) -> bool {
        true
    }

    // --- adjoint ------------------------------------------------------------

    /// Returns a *native* adjoint if this variant can represent one cheaply
    /// (e.g. `MatrixOperator` over `A^H`). `None` means the caller should
    /// fall back to a lazy [`crate::adjoint::AdjointWrap`].
    fn native_adjoint(&self) -> Option<Rc<dyn LinearOperator<T>>> {
        None
    }

    // --- materialization -----------------------------------------------------

    /// Materialize to a dense matrix, when the operator is rooted in
    /// concrete matrices. `None` for matrix-free operators.
    fn to_dense(&self) -> Option<Result<Array2<T>>> {
        None
    }

    /// Materialize to a sparse matrix (§6 `to_sparse(L)`), when the
    /// operator is rooted in concrete matrices. `None` for matrix-free
    /// operators, mirroring [`LinearOperator::to_dense`].
    #[cfg(feature = "sparse")]
    fn to_sparse(&self) -> Option<Result<sprs::CsMat<T>>> {
        None
    }
}

/// Returns an operator equal to the conjugate transpose of `op` (§4.0
/// `adjoint(L)`, §4.6). Self-adjoint operators are returned unchanged
/// (identity, not merely an equal value) per the testable property in §8.
pub fn adjoint<T: crate::types::Lapack + 'static>(
    op: Rc<dyn LinearOperator<T>>,
) -> Rc<dyn LinearOperator<T>> {
    if op.is_self_adjoint() {
        return op;
    }
    if let Some(native) = op.native_adjoint() {
        return native;
    }
    Rc::new(crate::adjoint::AdjointWrap::new(op))
}

/// Returns an operator equal to the plain transpose of `op` (no
/// conjugation). For real scalars this coincides with [`adjoint`]; for
/// complex scalars a symmetric (not necessarily Hermitian) operator is
/// returned unchanged, otherwise a lazy [`crate::adjoint::TransposeWrap`] is
/// used.
pub fn transpose<T: crate::types::Lapack + 'static>(
    op: Rc<dyn LinearOperator<T>>,
) -> Rc<dyn LinearOperator<T>> {
    if !T::is_complex() {
        return adjoint(op);
    }
    if op.is_symmetric() {
        return op;
    }
    Rc::new(crate::adjoint::TransposeWrap::new(op))
}

// --- vector convenience wrappers --------------------------------------------

fn col_view<T: Scalar>(u: ArrayView1<T>) -> ArrayView2<T> {
    u.insert_axis(Axis(1))
}

fn col_view_mut<T: Scalar>(u: ArrayViewMut1<T>) -> ArrayViewMut2<T> {
    u.insert_axis(Axis(1))
}

/// `v = L . u` for a single vector `u`.
pub fn apply_vec<T: Scalar>(op: &dyn LinearOperator<T>, u: ArrayView1<T>) -> Result<Array1<T>> {
    let v = op.apply(col_view(u))?;
    Ok(v.remove_axis(Axis(1)))
}

/// `v <- L . u` for a single vector `u`, in place.
pub fn mul_into_vec<T: Scalar>(
    op: &dyn LinearOperator<T>,
    v: &mut ArrayViewMut1<T>,
    u: ArrayView1<T>,
) -> Result<()> {
    let mut v2 = col_view_mut(v.view_mut());
    op.mul_into(&mut v2, col_view(u))
}

/// `v <- alpha * (L . u) + beta * v` for a single vector `u`, in place.
pub fn mul_into_scaled_vec<T: Scalar>(
    op: &dyn LinearOperator<T>,
    v: &mut ArrayViewMut1<T>,
    u: ArrayView1<T>,
    alpha: T,
    beta: T,
) -> Result<()> {
    let mut v2 = col_view_mut(v.view_mut());
    op.mul_into_scaled(&mut v2, col_view(u), alpha, beta)
}

/// `v = L^-1 . u` for a single vector `u`.
pub fn solve_vec<T: Scalar>(op: &dyn LinearOperator<T>, u: ArrayView1<T>) -> Result<Array1<T>> {
    let v = op.solve(col_view(u))?;
    Ok(v.remove_axis(Axis(1)))
}

/// `v <- L^-1 . u` for a single vector `u`, in place.
pub fn ldiv_into_vec<T: Scalar>(
    op: &dyn LinearOperator<T>,
    v: &mut ArrayViewMut1<T>,
    u: ArrayView1<T>,
) -> Result<()> {
    let mut v2 = col_view_mut(v.view_mut());
    op.ldiv_into(&mut v2, col_view(u))
}

/// `u <- L^-1 . u` for a single vector `u`, in place.
pub fn ldiv_into_self_vec<T: Scalar>(
    op: &dyn LinearOperator<T>,
    u: &mut ArrayViewMut1<T>,
) -> Result<()> {
    let mut u2 = col_view_mut(u.view_mut());
    op.ldiv_into_self(&mut u2)
}

/// `update_coefficients!(L, u, p, t)` for a single vector `u`.
pub fn update_coefficients_vec<T: Scalar>(
    op: &dyn LinearOperator<T>,
    u: ArrayView1<T>,
    p: &dyn Any,
    t: T,
) -> Result<()> {
    op.update_coefficients(col_view(u), p, t)
}

/// `cache_operator(L, u)` for a single vector `u`.
pub fn cache_operator_vec<T: Scalar>(op: &dyn LinearOperator<T>, u: ArrayView1<T>) -> Result<()> {
    op.cache_operator(col_view(u))
}

pub(crate) fn check_apply_shape<T: Scalar>(
    op: &dyn LinearOperator<T>,
    u_rows: usize,
) -> Result<()> {
    let (m, n) = op.size();
    if u_rows != n {
        return Err(OperatorError::shape_mismatch(
            op.variant_name(),
            (m, n),
            (u_rows, n),
        ));
    }
    Ok(())
}
