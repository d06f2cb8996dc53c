//! `FunctionOperator` (§4.4): a matrix-free operator given by callables.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::error::{OperatorError, Result};
use crate::opnorm::{require_opnorm, NormType, OpNorm};
use crate::params::NoParams;
use crate::traits::LinearOperator;
use crate::types::{Scalar, Size};

type OutOfPlaceFn<T, P> = Box<dyn Fn(ArrayView2<T>, &P, T) -> Result<Array2<T>>>;
type InPlaceFn<T, P> = Box<dyn Fn(&mut ArrayViewMut2<T>, ArrayView2<T>, &P, T) -> Result<()>>;

/// The four optional callables of §3/§4.4, stored according to the
/// in-place flag declared at construction. `P` is the caller's own
/// parameter type; it only meets `&dyn Any` at the object-safe
/// [`LinearOperator::update_coefficients`] boundary.
pub enum Callables<T: Scalar, P> {
    OutOfPlace {
        op: OutOfPlaceFn<T, P>,
        op_adjoint: Option<OutOfPlaceFn<T, P>>,
        op_inverse: Option<OutOfPlaceFn<T, P>>,
        op_adjoint_inverse: Option<OutOfPlaceFn<T, P>>,
    },
    InPlace {
        op: InPlaceFn<T, P>,
        op_adjoint: Option<InPlaceFn<T, P>>,
        op_inverse: Option<InPlaceFn<T, P>>,
        op_adjoint_inverse: Option<InPlaceFn<T, P>>,
    },
}

/// The traits record of §3: scalar type is carried by `T`, shape/iip/norm/
/// symmetry flags live here.
pub struct FunctionTraits<T: Scalar> {
    pub size: Size,
    pub iip: bool,
    pub opnorm: Option<OpNorm<T>>,
    pub symmetric: bool,
    pub hermitian: bool,
    pub posdef: bool,
}

pub struct FunctionOperator<T: Scalar, P: Clone + 'static = NoParams> {
    callables: Rc<Callables<T, P>>,
    traits: FunctionTraits<T>,
    p: RefCell<P>,
    t: Cell<T>,
    cache: RefCell<Option<Array2<T>>>,
}

impl<T: Scalar + 'static, P: Clone + 'static> FunctionOperator<T, P> {
    /// Out-of-place construction: `op(u,p,t) -> v`.
    pub fn out_of_place(
        size: Size,
        p0: P,
        op: impl Fn(ArrayView2<T>, &P, T) -> Result<Array2<T>> + 'static,
    ) -> Self {
        FunctionOperator {
            callables: Rc::new(Callables::OutOfPlace {
                op: Box::new(op),
                op_adjoint: None,
                op_inverse: None,
                op_adjoint_inverse: None,
            }),
            traits: FunctionTraits {
                size,
                iip: false,
                opnorm: None,
                symmetric: false,
                hermitian: false,
                posdef: false,
            },
            p: RefCell::new(p0),
            t: Cell::new(T::zero()),
            cache: RefCell::new(None),
        }
    }

    /// In-place construction: `op(v,u,p,t)`, must be allocation-free.
    pub fn in_place(
        size: Size,
        p0: P,
        op: impl Fn(&mut ArrayViewMut2<T>, ArrayView2<T>, &P, T) -> Result<()> + 'static,
    ) -> Self {
        FunctionOperator {
            callables: Rc::new(Callables::InPlace {
                op: Box::new(op),
                op_adjoint: None,
                op_inverse: None,
                op_adjoint_inverse: None,
            }),
            traits: FunctionTraits {
                size,
                iip: true,
                opnorm: None,
                symmetric: false,
                hermitian: false,
                posdef: false,
            },
            p: RefCell::new(p0),
            t: Cell::new(T::zero()),
            cache: RefCell::new(None),
        }
    }

    pub fn with_adjoint_out_of_place(
        mut self,
        op_adjoint: impl Fn(ArrayView2<T>, &P, T) -> Result<Array2<T>> + 'static,
    ) -> Self {
        if let Callables::OutOfPlace { op_adjoint: slot, .. } = Rc::get_mut(&mut self.callables)
            .expect("callables not yet shared")
        {
            *slot = Some(Box::new(op_adjoint));
        }
        self
    }

    pub fn with_inverse_out_of_place(
        mut self,
        op_inverse: impl Fn(ArrayView2<T>, &P, T) -> Result<Array2<T>> + 'static,
    ) -> Self {
        if let Callables::OutOfPlace { op_inverse: slot, .. } = Rc::get_mut(&mut self.callables)
            .expect("callables not yet shared")
        {
            *slot = Some(Box::new(op_inverse));
        }
        self
    }

    pub fn with_adjoint_in_place(
        mut self,
        op_adjoint: impl Fn(&mut ArrayViewMut2<T>, ArrayView2<T>, &P, T) -> Result<()> + 'static,
    ) -> Self {
        if let Callables::InPlace { op_adjoint: slot, .. } = Rc::get_mut(&mut self.callables)
            .expect("callables not yet shared")
        {
            *slot = Some(Box::new(op_adjoint));
        }
        self
    }

    pub fn with_inverse_in_place(
        mut self,
        op_inverse: impl Fn(&mut ArrayViewMut2<T>, ArrayView2<T>, &P, T) -> Result<()> + 'static,
    ) -> Self {
        if let Callables::InPlace { op_inverse: slot, .. } = Rc::get_mut(&mut self.callables)
            .expect("callables not yet shared")
        {
            *slot = Some(Box::new(op_inverse));
        }
        self
    }

    pub fn symmetric(mut self) -> Self {
        self.traits.symmetric = true;
        self
    }

    pub fn hermitian(mut self) -> Self {
        self.traits.hermitian = true;
        self
    }

    pub fn posdef(mut self) -> Self {
        self.traits.posdef = true;
        self
    }

    pub fn with_opnorm(mut self, opnorm: OpNorm<T>) -> Self {
        self.traits.opnorm = Some(opnorm);
        self
    }

    pub fn opnorm(&self, norm: NormType) -> Result<T::Real> {
        require_opnorm(&self.traits.opnorm, norm, self.variant_name())
    }

    /// Derived rule (§4.4): if hermitian/real-symmetric and no adjoint was
    /// supplied, the forward callable doubles as the adjoint; if an
    /// inverse was supplied with no adjoint-inverse, the inverse doubles
    /// as the adjoint-inverse.
    fn self_dual(&self) -> bool {
        self.traits.hermitian || (!T::is_complex() && self.traits.symmetric)
    }

    fn has_explicit_adjoint(&self) -> bool {
        match &*self.callables {
            Callables::OutOfPlace { op_adjoint, .. } => op_adjoint.is_some(),
            Callables::InPlace { op_adjoint, .. } => op_adjoint.is_some(),
        }
    }

    fn has_native_inverse(&self) -> bool {
        match &*self.callables {
            Callables::OutOfPlace { op_inverse, .. } => op_inverse.is_some(),
            Callables::InPlace { op_inverse, .. } => op_inverse.is_some(),
        }
    }

    /// §4.4 adjoint constructor: swap `(op <-> op_adjoint)` and
    /// `(op_inverse <-> op_adjoint_inverse)`, reverse shape, copy `(p,t)`,
    /// and preserve the cache only when square (a non-square cache would
    /// no longer match the swapped `(m,n)`; resolved open question, §9).
    fn swapped(&self) -> FunctionOperatorAdjointView<T, P> {
        FunctionOperatorAdjointView {
            callables: Rc::clone(&self.callables),
            size: (self.traits.size.1, self.traits.size.0),
            iip: self.traits.iip,
            symmetric: self.traits.symmetric,
            hermitian: self.traits.hermitian,
            posdef: self.traits.posdef,
            p: self.p.borrow().clone(),
            t: self.t.get(),
            cache: if self.is_square() {
                self.cache.borrow().clone()
            } else {
                None
            },
        }
    }
}

impl<T: Scalar + 'static, P: Clone + 'static> LinearOperator<T> for FunctionOperator<T, P> {
    fn variant_name(&self) -> &'static str {
        "FunctionOperator"
    }

    fn size(&self) -> Size {
        self.traits.size
    }

    fn has_mul(&self) -> bool {
        !self.traits.iip
    }

    fn has_mul_inplace(&self) -> bool {
        self.traits.iip
    }

    fn has_ldiv(&self) -> bool {
        !self.traits.iip && self.has_native_inverse()
    }

    fn has_ldiv_inplace(&self) -> bool {
        self.traits.iip && self.has_native_inverse()
    }

    fn has_adjoint(&self) -> bool {
        true
    }

    fn is_constant(&self) -> bool {
        false
    }

    fn is_symmetric(&self) -> bool {
        self.traits.symmetric
    }

    fn is_hermitian(&self) -> bool {
        self.traits.hermitian
    }

    fn is_posdef(&self) -> bool {
        self.traits.posdef
    }

    fn apply(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        log::trace!("FunctionOperator::apply (shape {:?})", self.size());
        match &*self.callables {
            Callables::OutOfPlace { op, .. } => op(u, &self.p.borrow(), self.t.get()),
            Callables::InPlace { .. } => Err(OperatorError::unsupported(
                "apply",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn mul_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        match &*self.callables {
            Callables::InPlace { op, .. } => op(v, u, &self.p.borrow(), self.t.get()),
            Callables::OutOfPlace { .. } => Err(OperatorError::unsupported(
                "mul!",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn mul_into_scaled(
        &self,
        v: &mut ArrayViewMut2<T>,
        u: ArrayView2<T>,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        if !self.is_cached() {
            return Err(OperatorError::cache_not_initialized(
                self.variant_name(),
                self.size(),
            ));
        }
        let snapshot = v.to_owned();
        self.mul_into(v, u)?;
        ndarray::Zip::from(&mut *v)
            .and(&snapshot)
            .for_each(|vi, &v0| *vi = alpha * *vi + beta * v0);
        Ok(())
    }

    fn solve(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        match &*self.callables {
            Callables::OutOfPlace {
                op_inverse: Some(op_inverse),
                ..
            } => op_inverse(u, &self.p.borrow(), self.t.get()),
            _ => Err(OperatorError::unsupported(
                "solve",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn ldiv_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        match &*self.callables {
            Callables::InPlace {
                op_inverse: Some(op_inverse),
                ..
            } => op_inverse(v, u, &self.p.borrow(), self.t.get()),
            _ => Err(OperatorError::unsupported(
                "ldiv!",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn ldiv_into_self(&self, u: &mut ArrayViewMut2<T>) -> Result<()> {
        if !self.is_cached() {
            return Err(OperatorError::cache_not_initialized(
                self.variant_name(),
                self.size(),
            ));
        }
        let snapshot = u.to_owned();
        self.ldiv_into(u, snapshot.view())
    }

    fn update_coefficients(&self, _u: ArrayView2<T>, p: &dyn Any, t: T) -> Result<()> {
        log::debug!("FunctionOperator::update_coefficients (shape {:?})", self.size());
        if let Some(p_concrete) = p.downcast_ref::<P>() {
            *self.p.borrow_mut() = p_concrete.clone();
        }
        self.t.set(t);
        Ok(())
    }

    fn cache_operator(&self, u: ArrayView2<T>) -> Result<()> {
        log::debug!("FunctionOperator::cache_operator (shape {:?})", self.size());
        if self.traits.iip {
            *self.cache.borrow_mut() = Some(Array2::zeros(u.raw_dim()));
        }
        Ok(())
    }

    fn is_cached(&self) -> bool {
        !self.traits.iip || self.cache.borrow().is_some()
    }

    fn native_adjoint(&self) -> Option<Rc<dyn LinearOperator<T>>> {
        if self.self_dual() {
            return None; // handled by `is_self_adjoint` short-circuit upstream
        }
        if !self.has_explicit_adjoint() {
            return None; // caller falls back to AdjointWrap
        }
        Some(Rc::new(self.swapped()))
    }
}

/// The result of swapping a `FunctionOperator`'s forward/adjoint callable
/// pair. A distinct type (rather than reusing `FunctionOperator` with a
/// "swapped" flag) because the swap also reverses which slot is primary.
struct FunctionOperatorAdjointView<T: Scalar, P: Clone + 'static> {
    callables: Rc<Callables<T, P>>,
    size: Size,
    iip: bool,
    symmetric: bool,
    hermitian: bool,
    posdef: bool,
    p: P,
    t: T,
    cache: Option<Array2<T>>,
}

impl<T: Scalar + 'static, P: Clone + 'static> FunctionOperatorAdjointView<T, P> {
    fn has_native_inverse(&self) -> bool {
        match &*self.callables {
            Callables::OutOfPlace {
                op_adjoint_inverse, ..
            } => op_adjoint_inverse.is_some(),
            Callables::InPlace {
                op_adjoint_inverse, ..
            } => op_adjoint_inverse.is_some(),
        }
    }
}

impl<T: Scalar + 'static, P: Clone + 'static> LinearOperator<T> for FunctionOperatorAdjointView<T, P> {
    fn variant_name(&self) -> &'static str {
        "FunctionOperator"
    }

    fn size(&self) -> Size {
        self.size
    }

    fn has_mul(&self) -> bool {
        !self.iip
    }

    fn has_mul_inplace(&self) -> bool {
        self.iip
    }

    fn has_ldiv(&self) -> bool {
        !self.iip && self.has_native_inverse()
    }

    fn has_ldiv_inplace(&self) -> bool {
        self.iip && self.has_native_inverse()
    }

    fn has_adjoint(&self) -> bool {
        true
    }

    fn is_constant(&self) -> bool {
        false
    }

    fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    fn is_hermitian(&self) -> bool {
        self.hermitian
    }

    fn is_posdef(&self) -> bool {
        self.posdef
    }

    fn apply(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        match &*self.callables {
            Callables::OutOfPlace {
                op_adjoint: Some(op_adjoint),
                ..
            } => op_adjoint(u, &self.p, self.t),
            _ => Err(OperatorError::unsupported(
                "apply",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn mul_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        match &*self.callables {
            Callables::InPlace {
                op_adjoint: Some(op_adjoint),
                ..
            } => op_adjoint(v, u, &self.p, self.t),
            _ => Err(OperatorError::unsupported(
                "mul!",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn solve(&self, u: ArrayView2<T>) -> Result<Array2<T>> {
        match &*self.callables {
            Callables::OutOfPlace {
                op_adjoint_inverse: Some(f),
                ..
            } => f(u, &self.p, self.t),
            _ => Err(OperatorError::unsupported(
                "solve",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn ldiv_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        match &*self.callables {
            Callables::InPlace {
                op_adjoint_inverse: Some(f),
                ..
            } => f(v, u, &self.p, self.t),
            _ => Err(OperatorError::unsupported(
                "ldiv!",
                self.variant_name(),
                self.size(),
            )),
        }
    }

    fn is_cached(&self) -> bool {
        !self.iip || self.cache.is_some()
    }

    fn to_dense(&self) -> Option<Result<Array2<T>>> {
        None
    }
}
