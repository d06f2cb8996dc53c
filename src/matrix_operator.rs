//! `MatrixOperator` (§4.1): a mutable matrix with an optional time-update
//! hook.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut2, Axis};
use ndarray_linalg::Solve;

use crate::error::{OperatorError, Result};
use crate::traits::LinearOperator;
use crate::types::{Lapack, Scalar, Size};

/// Backing storage for a `MatrixOperator`. Dense is the general case;
/// `Diagonal` is a common specialization that is always invertible in
/// closed form (used by §8 scenario 3); `Sparse` is gated behind the
/// `sparse` feature and only supports `apply`, matching the "solve iff the
/// matrix advertises left-division" rule of §4.1.
pub enum MatrixStorage<T: Scalar> {
    Dense(Array2<T>),
    Diagonal(Array1<T>),
    #[cfg(feature = "sparse")]
    Sparse(sprs::CsMat<T>),
}

impl<T: Scalar> MatrixStorage<T> {
    pub fn shape(&self) -> Size {
        match self {
            MatrixStorage::Dense(a) => (a.nrows(), a.ncols()),
            MatrixStorage::Diagonal(d) => (d.len(), d.len()),
            #[cfg(feature = "sparse")]
            MatrixStorage::Sparse(s) => (s.rows(), s.cols()),
        }
    }
}

/// Update hook `phi(A, u, p, t)`, expected to mutate `A` in place. The
/// default hook is the identity, which marks the operator constant (§4.1).
pub type UpdateHook<T> = Rc<dyn Fn(&mut MatrixStorage<T>, ArrayView1<T>, &dyn Any, T)>;

pub struct MatrixOperator<T: Scalar> {
    storage: Rc<RefCell<MatrixStorage<T>>>,
    hook: Option<UpdateHook<T>>,
    transposed: bool,
    hermitian_view: bool,
    symmetric: bool,
    hermitian: bool,
    posdef: bool,
}

impl<T: Scalar + Lapack> MatrixOperator<T> {
    pub fn new(a: Array2<T>) -> Self {
        MatrixOperator {
            storage: Rc::new(RefCell::new(MatrixStorage::Dense(a))),
            hook: None,
            transposed: false,
            hermitian_view: false,
            symmetric: false,
            hermitian: false,
            posdef: false,
        }
    }

    pub fn diagonal(d: Array1<T>) -> Self {
        MatrixOperator {
            storage: Rc::new(RefCell::new(MatrixStorage::Diagonal(d))),
            hook: None,
            transposed: false,
            hermitian_view: false,
            symmetric: true,
            hermitian: true,
            posdef: false,
        }
    }

    #[cfg(feature = "sparse")]
    pub fn sparse(a: sprs::CsMat<T>) -> Self {
        MatrixOperator {
            storage: Rc::new(RefCell::new(MatrixStorage::Sparse(a))),
            hook: None,
            transposed: false,
            hermitian_view: false,
            symmetric: false,
            hermitian: false,
            posdef: false,
        }
    }

    /// Attach an update hook. Without one, the operator is constant.
    pub fn with_update_hook(mut self, hook: UpdateHook<T>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn symmetric(mut self) -> Self {
        self.symmetric = true;
        self
    }

    pub fn hermitian(mut self) -> Self {
        self.hermitian = true;
        self
    }

    pub fn posdef(mut self) -> Self {
        self.posdef = true;
        self
    }

    fn with_view(&self, transposed: bool, hermitian: bool) -> Self {
        MatrixOperator {
            storage: Rc::clone(&self.storage),
            hook: self.hook.clone(),
            transposed,
            hermitian_view: hermitian,
            symmetric: self.symmetric,
            hermitian: self.hermitian,
            posdef: self.posdef,
        }
    }

    fn dense(&self) -> Result<Array2<T>> {
        let storage = self.storage.borrow();
        let dense = match &*storage {
            MatrixStorage::Dense(a) => a.clone(),
            MatrixStorage::Diagonal(d) => {
                let n = d.len();
                let mut a = Array2::zeros((n, n));
                for i in 0..n {
                    a[(i, i)] = d[i];
                }
                a
            }
            #[cfg(feature = "sparse")]
            MatrixStorage::Sparse(s) => {
                let mut a = Array2::zeros((s.rows(), s.cols()));
                for (value, (row, col)) in s.iter() {
                    a[(row, col)] = *value;
                }
                a
            }
        };
        Ok(self.orient(dense))
    }

    fn orient(&self, a: Array2<T>) -> Array2<T> {
        let a = if self.transposed { a.reversed_axes() } else { a };
        if self.hermitian_view {
            a.mapv(|x| x.conj())
        } else {
            a
        }
    }
}

impl<T: Scalar + Lapack> LinearOperator<T> for MatrixOperator<T> {
    fn variant_name(&self) -> &'static str {
        "MatrixOperator"
    }

    fn size(&self) -> Size {
        let (m, n) = self.storage.borrow().shape();
        if self.transposed {
            (n, m)
        } else {
            (m, n)
        }
    }

    fn has_mul(&self) -> bool {
        true
    }

    fn has_mul_inplace(&self) -> bool {
        matches!(&*self.storage.borrow(), MatrixStorage::Dense(_) | MatrixStorage::Diagonal(_))
    }

    fn has_ldiv(&self) -> bool {
        self.is_square() && matches!(&*self.storage.borrow(), MatrixStorage::Dense(_) | MatrixStorage::Diagonal(_))
    }

    fn has_ldiv_inplace(&self) -> bool {
        self.has_ldiv()
    }

    fn has_adjoint(&self) -> bool {
        true
    }

    fn is_constant(&self) -> bool {
        self.hook.is_none()
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

    fn apply(&self, u: ndarray::ArrayView2<T>) -> Result<Array2<T>> {
        log::trace!("MatrixOperator::apply on {:?}", self.size());
        let a = self.dense()?;
        if a.ncols() != u.nrows() {
            return Err(OperatorError::shape_mismatch(
                self.variant_name(),
                self.size(),
                (u.nrows(), u.ncols()),
            ));
        }
        Ok(a.dot(&u))
    }

    fn mul_into(&self, v: &mut ArrayViewMut2<T>, u: ArrayView2<T>) -> Result<()> {
        let result = self.apply(u)?;
        v.assign(&result);
        Ok(())
    }

    fn mul_into_scaled(
        &self,
        v: &mut ArrayViewMut2<T>,
        u: ArrayView2<T>,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        let lu = self.apply(u)?;
        ndarray::Zip::from(&mut *v).and(&lu).for_each(|vi, &li| {
            *vi = alpha * li + beta * *vi;
        });
        Ok(())
    }

    fn solve(&self, u: ndarray::ArrayView2<T>) -> Result<Array2<T>> {
        log::trace!("MatrixOperator::solve on {:?}", self.size());
        if !self.is_square() {
            return Err(OperatorError::not_square(self.variant_name(), self.size()));
        }
        match &*self.storage.borrow() {
            MatrixStorage::Diagonal(d) => {
                let d = self.orient(Array2::from_diag(d)).diag().to_owned();
                let mut out = u.to_owned();
                for mut col in out.columns_mut() {
                    col.zip_mut_with(&d, |x, &di| *x = *x / di);
                }
                Ok(out)
            }
            MatrixStorage::Dense(_) => {
                let a = self.dense()?;
                let mut out = Array2::zeros(u.raw_dim());
                for (mut out_col, in_col) in out.columns_mut().into_iter().zip(u.columns()) {
                    let x = a.solve(&in_col)?;
                    out_col.assign(&x);
                }
                Ok(out)
            }
            #[cfg(feature = "sparse")]
            MatrixStorage::Sparse(_) => Err(OperatorError::unsupported(
                "solve",
                self.variant_name(),
                self.size(),
            )),
        }
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

    fn update_coefficients(&self, u: ndarray::ArrayView2<T>, p: &dyn Any, t: T) -> Result<()> {
        if let Some(hook) = &self.hook {
            log::debug!("MatrixOperator::update_coefficients (shape {:?})", self.size());
            let u_vec = u.index_axis(Axis(1), 0);
            let mut storage = self.storage.borrow_mut();
            hook(&mut storage, u_vec, p, t);
        }
        Ok(())
    }

    fn native_adjoint(&self) -> Option<Rc<dyn LinearOperator<T>>> {
        Some(Rc::new(self.with_view(!self.transposed, !self.hermitian_view)))
    }

    fn to_dense(&self) -> Option<Result<Array2<T>>> {
        Some(self.dense())
    }

    #[cfg(feature = "sparse")]
    fn to_sparse(&self) -> Option<Result<sprs::CsMat<T>>> {
        Some(self.dense().map(|a| crate::convert::dense_to_sparse(&a)))
    }
}

impl<T: Scalar> Clone for MatrixOperator<T> {
    fn clone(&self) -> Self {
        MatrixOperator {
            storage: Rc::clone(&self.storage),
            hook: self.hook.clone(),
            transposed: self.transposed,
            hermitian_view: self.hermitian_view,
            symmetric: self.symmetric,
            hermitian: self.hermitian,
            posdef: self.posdef,
        }
    }
}
