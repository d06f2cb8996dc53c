//! Error taxonomy for the operator algebra.

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, OperatorError>;

/// Master error type of this crate.
///
/// Every variant carries the concrete operator variant name and, where
/// relevant, the shape involved, so a caller can diagnose a fault without
/// re-deriving it from the call site.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Operation invoked on an operator that does not advertise the
    /// capability (queried via `has_mul`, `has_ldiv`, ... in [`crate::traits`]).
    #[error("{op} is not supported by {variant} (shape {m}x{n})")]
    Unsupported {
        op: &'static str,
        variant: &'static str,
        m: usize,
        n: usize,
    },

    /// Input or output leading dimension disagrees with `size(L)`.
    #[error("shape mismatch in {variant}: expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        variant: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// An in-place kernel that requires a workspace was called before
    /// `cache_operator`.
    #[error("{variant} (shape {m}x{n}) has no workspace; call cache_operator first")]
    CacheNotInitialized {
        variant: &'static str,
        m: usize,
        n: usize,
    },

    /// A required attribute (e.g. a stored `opnorm`) was not supplied at
    /// construction time.
    #[error("{variant} is missing required attribute {attribute}")]
    MissingAttribute {
        variant: &'static str,
        attribute: &'static str,
    },

    /// The operator is not square where squareness is required (solve,
    /// factorization).
    #[error("{variant} is not square: {m}x{n}")]
    NotSquare {
        variant: &'static str,
        m: usize,
        n: usize,
    },

    /// Two operands in a tensor product or composition disagree in the
    /// scalar domain they were constructed over.
    #[error("incompatible tensor factors: outer is {outer:?}, inner is {inner:?}")]
    IncompatibleFactors {
        outer: (usize, usize),
        inner: (usize, usize),
    },

    /// Propagated unmodified from the backing dense/sparse matrix library.
    #[error(transparent)]
    Backend(#[from] ndarray_linalg::error::LinalgError),

    /// Propagated unmodified from `ndarray`'s own shape-checking.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl OperatorError {
    pub fn unsupported(op: &'static str, variant: &'static str, size: (usize, usize)) -> Self {
        OperatorError::Unsupported {
            op,
            variant,
            m: size.0,
            n: size.1,
        }
    }

    pub fn shape_mismatch(
        variant: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        OperatorError::ShapeMismatch {
            variant,
            expected,
            found,
        }
    }

    pub fn cache_not_initialized(variant: &'static str, size: (usize, usize)) -> Self {
        OperatorError::CacheNotInitialized {
            variant,
            m: size.0,
            n: size.1,
        }
    }

    pub fn missing_attribute(variant: &'static str, attribute: &'static str) -> Self {
        OperatorError::MissingAttribute { variant, attribute }
    }

    pub fn not_square(variant: &'static str, size: (usize, usize)) -> Self {
        OperatorError::NotSquare {
            variant,
            m: size.0,
            n: size.1,
        }
    }
}
