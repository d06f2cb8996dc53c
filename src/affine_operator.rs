//! `AffineOperator` (§4.3): `L . u = A . u + b`. Not linear.

use std::any::Any;
use std::rc::Rc;

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2};

use crate::error::{OperatorError, Result};
use crate::traits::LinearOperator;
use crate::types::{Scalar, Size};

pub struct AffineOperator<T: Scalar> {
    a: Rc<dyn LinearOperator<T>>,
    b: Array1<T>,
}

impl<T: Scalar> AffineOperator<T> {
    pub fn new(a: Rc<dyn LinearOperator<T>>, b: Array1<T>) -> Result<Self> {
        let (m, _n) = a.size();
        if b.len() != m {
            return Err(OperatorError::shape_mismatch(
                "AffineOperator",
                (m, m),
                (b.len(), 1),
            ));
        }
        Ok(AffineOperator { a, b })
    }

    fn broadcast_b(&self, k: usize) -> Array2<T> {
        let m = self.b.len();
        let mut out = Array2::<T>::zeros((m, k));
        for mut col in out.columns_mut() {
            col.assign(&self.b);
        }
        out
    }
}

impl<T: Scalar> LinearOperator<T> for AffineOperator<T> {
    fn variant_name(&self) -> &'static str {
        "AffineOperator"
    }

    fn size(&self) -> Size {
        self.a.size()
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn has_mul(&self) -> bool {
        self.a.has_mul()
    }

    fn has_mul_inplace(&self) -> bool {
        self.a.has_mul_inplace()
    }

    fn has_ldiv(&self) -> bool {
        self.a.has_ldiv()
    }

    fn has_ldiv_inplace(&self) -> bool {
        self.a.has_ldiv_inplace()
    }

    fn has_adjoint(&self) -> bool {
        false
    }

    fn is_constant(&self) -> bool {
        self.a.is_constant()
    }

    fn apply(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        log::trace!("AffineOperator::apply on {:?}", self.size());
        let mut v = self.a.apply(u)?;
        for mut col in v.columns_mut() {
            col += &self.b;
        }
        Ok(v)
    }

    fn mul_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        self.a.mul_into(v, u)?;
        for mut col in v.columns_mut() {
            col += &self.b;
        }
        Ok(())
    }

    fn mul_into_scaled(
        &self,
        v: &mut ArrayViewMut2<T>,
        u: ArrayView2<T>,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        // v <- alpha*(A.u + b) + beta*v = mul!(v,A,u,alpha,beta) + alpha*b
        self.a.mul_into_scaled(v, u, alpha, beta)?;
        let ab = self.b.mapv(|bi| alpha * bi);
        for mut col in v.columns_mut() {
            col += &ab;
        }
        Ok(())
    }

    fn solve(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        log::trace!("AffineOperator::solve on {:?}", self.size());
        // L^-1 . u = A^-1 . (u - b)
        let k = u.ncols();
        let shifted = u.to_owned() - self.broadcast_b(k);
        self.a.solve(shifted.view())
    }

    fn ldiv_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        let result = self.solve(u)?;
        v.assign(&result);
        Ok(())
    }

    fn ldiv_into_self(&self, u: &mut ArrayViewMut2<T>) -> Result<()> {
        for mut col in u.columns_mut() {
            col -= &self.b;
        }
        let result = self.a.solve(u.view())?;
        u.assign(&result);
        Ok(())
    }

    fn update_coefficients(&self, u: ArrayView2<T>, p: &dyn Any, t: T) -> Result<()> {
        log::debug!("AffineOperator::update_coefficients (shape {:?})", self.size());
        self.a.update_coefficients(u, p, t)
    }

    fn cache_operator(&self, u: ArrayView2<T>) -> Result<()> {
        log::debug!("AffineOperator::cache_operator (shape {:?})", self.size());
        self.a.cache_operator(u)
    }

    fn is_cached(&self) -> bool {
        self.a.is_cached()
    }

    fn to_dense(&self) -> Option<Result<Array2<T>>> {
        // An affine map has no single matrix representation; expose the
        // linear part's materialization under the same name `to_dense`
        // would use for `A` alone is misleading, so affine operators
        // report no materialization, matching §6: "matrix-free operators
        // have no materialization path" — an affine map is not purely a
        // matrix map either.
        None
    }
}
