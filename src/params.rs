//! Caller-opaque parameters threaded through `update_coefficients!`.
//!
//! The source represents `p` as an arbitrary value of the caller's choosing
//! (commonly `NullParameters` when an operator has no parameters at all).
//! Rust has no `Any`-like dynamic dispatch blessed by default, so we model
//! `p` the same way `std::any::Any` models "caller-opaque data": operators
//! that are generic over their own parameter type store it directly, while
//! the object-safe [`crate::traits::LinearOperator`] trait accepts
//! `&dyn Any` at the call boundary so heterogeneous operators (tensor
//! products, affine wrappers, adjoints) can all share one update path.

use std::any::Any;

/// Placeholder for operators with no parameters, mirroring the source's
/// `NullParameters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoParams;

/// A type-erased view of the current parameters, passed to
/// `update_coefficients!`. Concrete operators downcast this with
/// `p.downcast_ref::<P>()` if they know their own parameter type.
pub type Params<'a> = &'a dyn Any;

/// Convenience constant for call sites that have no parameters to pass.
pub const NO_PARAMS: NoParams = NoParams;
