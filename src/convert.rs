//! Shape/layout helpers reused by materialization and the tensor-product
//! kernel: reshape and replicate arrays to feed the Kronecker kernel and
//! `to_dense`.

use ndarray::{Array2, ArrayView2};

use crate::types::Scalar;

/// Dense Kronecker product `outer ⊗ inner`, used by
/// `TensorProductOperator::to_dense` and as the reference implementation
/// the kernel in [`crate::tensor_product`] is checked against.
pub fn kron<T: Scalar>(outer: ArrayView2<T>, inner: ArrayView2<T>) -> Array2<T> {
    let (m_o, n_o) = outer.dim();
    let (m_i, n_i) = inner.dim();
    let mut out = Array2::<T>::zeros((m_o * m_i, n_o * n_i));
    for i in 0..m_o {
        for j in 0..n_o {
            let block = inner.mapv(|x| x * outer[(i, j)]);
            out.slice_mut(ndarray::s![
                i * m_i..(i + 1) * m_i,
                j * n_i..(j + 1) * n_i
            ])
            .assign(&block);
        }
    }
    out
}

/// Unvec column `col` of a `(rows*cols, k)` batch into an already-allocated
/// `(rows, cols)` buffer, `rows` fastest-varying. A caller that calls this
/// once per column inside a loop (the tensor-product kernel's in-place path)
/// never allocates past `cache_operator` time.
pub fn fill_from_column<T: Scalar>(
    dst: &mut Array2<T>,
    u: ArrayView2<T>,
    col: usize,
    rows: usize,
    cols: usize,
) {
    debug_assert_eq!(u.nrows(), rows * cols);
    debug_assert_eq!(dst.dim(), (rows, cols));
    for j in 0..cols {
        for i in 0..rows {
            dst[(i, j)] = u[(j * rows + i, col)];
        }
    }
}

/// Write column `col` of a `(rows*cols, k)` batch from the *transpose* of a
/// `(cols, rows)` matrix, `rows` fastest-varying: `out[row_index(i,j), col] =
/// mat[(j, i)]`. Used by the tensor-product kernel, whose last step produces
/// `Vᵀ` rather than `V`.
pub fn write_column_transposed<T: Scalar>(
    out: &mut ndarray::ArrayViewMut2<T>,
    col: usize,
    mat: &Array2<T>,
    rows: usize,
    cols: usize,
) {
    debug_assert_eq!(mat.dim(), (cols, rows));
    for j in 0..cols {
        for i in 0..rows {
            out[(j * rows + i, col)] = mat[(j, i)];
        }
    }
}

/// Convert a dense matrix to compressed-sparse-row form, dropping exact
/// zeros. Backs `to_sparse` on the operator variants that materialize to a
/// dense matrix (§6 `to_sparse(L)`).
#[cfg(feature = "sparse")]
pub fn dense_to_sparse<T: Scalar>(a: &Array2<T>) -> sprs::CsMat<T> {
    let (m, n) = a.dim();
    let mut tri = sprs::TriMat::new((m, n));
    for i in 0..m {
        for j in 0..n {
            let v = a[(i, j)];
            if v != T::zero() {
                tri.add_triplet(i, j, v);
            }
        }
    }
    tri.to_csr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn kron_matches_hand_worked_example() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![[1.0, 2.0], [3.0, 4.0]];
        let expected = array![
            [1.0, 2.0, 0.0, 0.0],
            [3.0, 4.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 2.0],
            [0.0, 0.0, 3.0, 4.0],
        ];
        assert_abs_diff_eq!(kron(a.view(), b.view()), expected, epsilon = 1e-12);
    }

    #[test]
    fn fill_from_column_then_write_column_transposed_round_trips() {
        // column-major unvec of a length-6 column into a (3,2) matrix, then
        // writing its transpose back out reproduces the original ordering
        // after un-transposing, matching the kernel's own use of the pair.
        let u = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let mut buf = Array2::<f64>::zeros((3, 2));
        fill_from_column(&mut buf, u.view(), 0, 3, 2);
        assert_abs_diff_eq!(buf, array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]], epsilon = 1e-12);

        let transposed = buf.t().to_owned();
        let mut out = Array2::<f64>::zeros((6, 1));
        write_column_transposed(&mut out.view_mut(), 0, &transposed, 3, 2);
        assert_abs_diff_eq!(out, u, epsilon = 1e-12);
    }
}
