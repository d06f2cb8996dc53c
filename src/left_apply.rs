//! Left-apply dispatch (§4.7): `u · L` and `u / L`, where `u` is presented as
//! a transpose/adjoint view rather than a plain column batch.
//!
//! Since every operator here is `Ix2`-based, a "row vector `u`" is just the
//! same column data read the other way around: `u · L` for a transpose view
//! of `u` equals `(Lᵀ · u)ᵀ`, and the right-hand side's result, stored as a
//! column, *is* the row vector the caller wants — no separate row-major type
//! is needed. So the whole dualization rule collapses to "apply the dual of
//! `L` to the plain column data of `u`".

use std::rc::Rc;

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::error::Result;
use crate::traits::{self, LinearOperator};
use crate::types::Lapack;

/// Which dual view `u` (and `v`, for the in-place forms) is presented
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualKind {
    Transpose,
    Adjoint,
}

fn dual<T: Lapack + 'static>(l: Rc<dyn LinearOperator<T>>, kind: DualKind) -> Rc<dyn LinearOperator<T>> {
    match kind {
        DualKind::Transpose => traits::transpose(l),
        DualKind::Adjoint => traits::adjoint(l),
    }
}

/// `u · L`, freshly allocated: dispatches to `dual(L)` applied to `u`'s
/// underlying column data.
pub fn mul_left<T: Lapack + 'static>(
    l: &Rc<dyn LinearOperator<T>>,
    u: ArrayView2<T>,
    kind: DualKind,
) -> Result<Array2<T>> {
    log::trace!("left-apply mul (kind {:?})", kind);
    dual(Rc::clone(l), kind).apply(u)
}

/// `u / L`, freshly allocated: dispatches to `dual(L)` solved against `u`'s
/// underlying column data.
pub fn ldiv_left<T: Lapack + 'static>(
    l: &Rc<dyn LinearOperator<T>>,
    u: ArrayView2<T>,
    kind: DualKind,
) -> Result<Array2<T>> {
    log::trace!("left-apply ldiv (kind {:?})", kind);
    dual(Rc::clone(l), kind).solve(u)
}

/// `mul!(v,u,L)` with adjoint/transpose views on both `u` and `v`: dualize
/// both sides and call the right-multiply form in place.
pub fn mul_left_into<T: Lapack + 'static>(
    l: &Rc<dyn LinearOperator<T>>,
    v: &mut ArrayViewMut2<T>,
    u: ArrayView2<T>,
    kind: DualKind,
) -> Result<()> {
    log::trace!("left-apply mul! (kind {:?})", kind);
    dual(Rc::clone(l), kind).mul_into(v, u)
}

/// `ldiv!(v,u,L)` with adjoint/transpose views on both `u` and `v`.
pub fn ldiv_left_into<T: Lapack + 'static>(
    l: &Rc<dyn LinearOperator<T>>,
    v: &mut ArrayViewMut2<T>,
    u: ArrayView2<T>,
    kind: DualKind,
) -> Result<()> {
    log::trace!("left-apply ldiv! (kind {:?})", kind);
    dual(Rc::clone(l), kind).ldiv_into(v, u)
}
