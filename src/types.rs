//! Scalar bound and basic type aliases shared by every operator variant.

pub use cauchy::Scalar;
pub use ndarray_linalg::Lapack;

pub use num_complex::Complex32 as c32;
pub use num_complex::Complex64 as c64;

/// Shape of an operator: `(rows, cols)`, i.e. `(m, n)` for a map `T^n -> T^m`.
pub type Size = (usize, usize);
