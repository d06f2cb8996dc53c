//! Operator norm storage for matrix-free operators.
//!
//! A [`MatrixOperator`](crate::matrix_operator::MatrixOperator) or
//! [`InvertibleOperator`](crate::invertible_operator::InvertibleOperator) can
//! always compute its norm from the underlying matrix/factorization via
//! `ndarray_linalg`'s `OperationNorm` trait (re-exported here). A
//! [`FunctionOperator`](crate::function_operator::FunctionOperator) has no
//! matrix to measure, so the caller must supply either a fixed scalar or a
//! callback; `OpNorm` is that union.

pub use ndarray_linalg::NormType;

use crate::error::{OperatorError, Result};
use crate::types::Scalar;

/// Either a precomputed scalar norm, or a closure computed on demand. Used
/// by `FunctionOperator`'s `opnorm` trait record (§4.4).
pub enum OpNorm<T: Scalar> {
    Fixed(T::Real),
    Closure(Box<dyn Fn(NormType) -> T::Real>),
}

impl<T: Scalar> OpNorm<T> {
    pub fn eval(&self, norm: NormType) -> T::Real {
        match self {
            OpNorm::Fixed(value) => *value,
            OpNorm::Closure(f) => f(norm),
        }
    }
}

/// `opnorm(L, p)` for an operator whose norm attribute may be absent
/// (§7 "missing required attribute").
pub fn require_opnorm<T: Scalar>(
    stored: &Option<OpNorm<T>>,
    norm: NormType,
    variant: &'static str,
) -> Result<T::Real> {
    stored
        .as_ref()
        .map(|o| o.eval(norm))
        .ok_or_else(|| OperatorError::missing_attribute(variant, "opnorm"))
}
