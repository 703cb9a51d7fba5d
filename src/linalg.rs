//! Small complex Hermitian matrix operations shared by the estimators and
//! the filter designer.
//!
//! Everything here works on a single (batch, bin) matrix; broadcasting over
//! the leading dimensions is the caller's loop. Solving against a right-hand
//! side is preferred over forming explicit inverses.

use nalgebra::{DMatrix, DVector};
use num::{One, Zero};

use crate::{C, F};

pub(crate) fn is_finite(c: C) -> bool {
    c.re.is_finite() && c.im.is_finite()
}

/// Diagonal loading amount for a matrix of the given scale.
///
/// `eps` is interpreted relative to the mean diagonal magnitude, falling
/// back to `eps` itself for an (all but) zero matrix.
fn loading(a: &DMatrix<C>, eps: F) -> F {
    let scale = a.diagonal().iter().map(|c| c.norm()).sum::<F>() / a.nrows() as F;
    if scale > F::EPSILON {
        eps * scale
    } else {
        eps
    }
}

/// Solves `(A + λI) X = B` by LU decomposition, with λ chosen by
/// [`loading`].
///
/// Returns `None` when the loaded matrix is still singular or the solution
/// contains non-finite values, leaving the error report to the caller.
pub(crate) fn solve_loaded(a: &DMatrix<C>, b: &DMatrix<C>, eps: F) -> Option<DMatrix<C>> {
    let mut a = a.clone();
    let lambda = C::new(loading(&a, eps), 0.0);
    for i in 0..a.nrows() {
        a[(i, i)] += lambda;
    }
    let x = a.lu().solve(b)?;
    x.iter().all(|&c| is_finite(c)).then_some(x)
}

/// First `columns` columns of the regularized inverse `(A + λI)⁻¹`,
/// computed as a solve against the corresponding identity columns.
pub(crate) fn inverse_columns(a: &DMatrix<C>, columns: usize, eps: F) -> Option<DMatrix<C>> {
    solve_loaded(a, &DMatrix::identity(a.nrows(), columns), eps)
}

/// Accumulates the weighted rank-1 update `acc += w · x · xᴴ`.
///
/// The update is Hermitian by construction, so repeated accumulation keeps
/// the matrix Hermitian without any post-hoc symmetrization.
pub(crate) fn accumulate_outer(acc: &mut DMatrix<C>, x: &DVector<C>, w: F) {
    acc.gerc(C::new(w, 0.0), x, x, C::one());
}

pub(crate) fn zeros(n: usize) -> DMatrix<C> {
    DMatrix::from_element(n, n, C::zero())
}
