//! `linop-core` provides a composable algebra of linear and affine operators
//! over [`ndarray`](https://github.com/rust-ndarray/ndarray) arrays, aimed at
//! the matrix-free and matrix-backed operators that show up inside
//! iterative ODE/PDE solvers.
//!
//! Operator variants
//! -----------------------
//! - [`matrix_operator::MatrixOperator`]: a mutable dense/diagonal/sparse
//!   matrix with an optional time-update hook.
//! - [`invertible_operator::InvertibleOperator`]: a frozen factorization
//!   (LU, QR, Cholesky, LDLᵀ, Bunch-Kaufman, LQ, SVD) exposing `solve`.
//! - [`affine_operator::AffineOperator`]: `L . u = A . u + b`.
//! - [`function_operator::FunctionOperator`]: a matrix-free operator given
//!   by out-of-place or in-place callables.
//! - [`tensor_product::TensorProductOperator`]: the lazy Kronecker product
//!   `outer ⊗ inner`.
//! - [`identity::IdentityOperator`]: the multiplicative identity, used by
//!   the tensor-product collapse rule.
//! - [`adjoint::AdjointWrap`]/[`adjoint::TransposeWrap`]: lazy fallbacks for
//!   operators with no native adjoint/transpose.
//!
//! Every variant implements the common [`traits::LinearOperator`] interface,
//! so they can be composed and stored behind `Rc<dyn LinearOperator<T>>`
//! regardless of which variant backs them.
//!
//! Naming convention
//! -----------------------
//! Apply/solve on every operator here operate on `Ix2` views: a single
//! vector is just an `(n, 1)` matrix. [`traits::apply_vec`] and its siblings
//! are thin convenience wrappers around the batched form for the common
//! single-vector case.

#![allow(clippy::type_complexity, clippy::too_many_arguments)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::private_intra_doc_links)]

#[macro_use]
extern crate ndarray;

pub mod adjoint;
pub mod affine_operator;
pub mod convert;
pub mod error;
pub mod factorize;
pub mod function_operator;
pub mod identity;
pub mod invertible_operator;
pub mod left_apply;
pub mod matrix_operator;
pub mod opnorm;
pub mod params;
pub mod tensor_product;
pub mod traits;
pub mod types;

pub use crate::adjoint::{AdjointWrap, TransposeWrap};
pub use crate::affine_operator::AffineOperator;
pub use crate::error::{OperatorError, Result};
pub use crate::factorize::{
    bunchkaufman, cholesky, factorize, ldlt, lq, lu, qr, svd, Factorization,
};
pub use crate::function_operator::FunctionOperator;
pub use crate::identity::IdentityOperator;
pub use crate::invertible_operator::InvertibleOperator;
pub use crate::left_apply::{ldiv_left, ldiv_left_into, mul_left, mul_left_into, DualKind};
pub use crate::matrix_operator::{MatrixOperator, MatrixStorage};
pub use crate::opnorm::{NormType, OpNorm};
pub use crate::params::{NoParams, Params, NO_PARAMS};
pub use crate::tensor_product::{kron_pair, tensor_product, Factor, TensorProductOperator};
pub use crate::traits::{adjoint, transpose, LinearOperator};
pub use crate::types::{c32, c64, Lapack, Scalar, Size};
