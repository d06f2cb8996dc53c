//! The multiplicative identity operator, used by [`crate::tensor_product`]'s
//! `T(a) = a` scalar rule and identity-collapse combinator (§4.5).

use std::any::Any;

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::error::Result;
use crate::traits::LinearOperator;
use crate::types::{Scalar, Size};

pub struct IdentityOperator {
    n: usize,
}

impl IdentityOperator {
    pub fn new(n: usize) -> Self {
        IdentityOperator { n }
    }
}

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn variant_name(&self) -> &'static str {
        "IdentityOperator"
    }

    fn size(&self) -> Size {
        (self.n, self.n)
    }

    fn has_mul_inplace(&self) -> bool {
        true
    }

    fn has_ldiv(&self) -> bool {
        true
    }

    fn has_ldiv_inplace(&self) -> bool {
        true
    }

    fn has_adjoint(&self) -> bool {
        true
    }

    fn is_symmetric(&self) -> bool {
        true
    }

    fn is_hermitian(&self) -> bool {
        true
    }

    fn is_posdef(&self) -> bool {
        true
    }

    fn is_identity(&self) -> bool {
        true
    }

    fn apply(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        Ok(u.to_owned())
    }

    fn mul_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        v.assign(&u);
        Ok(())
    }

    fn mul_into_scaled(
        &self,
        v: &mut ArrayViewMut2<T>,
        u: ArrayView2<T>,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        ndarray::Zip::from(&mut *v)
            .and(&u)
            .for_each(|vi, &ui| *vi = alpha * ui + beta * *vi);
        Ok(())
    }

    fn solve(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        Ok(u.to_owned())
    }

    fn ldiv_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        v.assign(&u);
        Ok(())
    }

    fn ldiv_into_self(&self, _u: &mut ArrayViewMut2<T>) -> Result<()> {
        Ok(())
    }

    fn update_coefficients(&self, _u: ArrayView2<T>, _p: &dyn Any, _t: T) -> Result<()> {
        Ok(())
    }

    fn to_dense(&self) -> Option<Result<Array2<T>>> {
        Some(Ok(Array2::eye(self.n)))
    }
}
