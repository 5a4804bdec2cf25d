//! Angular-momentum operator matrices for a single multiplet.
//!
//! All matrices are expressed in the projection basis `|m⟩`, `m = -J, ..., J`
//! in ascending order (see [`SpinTotal::projections`]).

use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::spin::SpinTotal;

/// Projection numbers `m` as an array.
pub fn jrange(j: SpinTotal) -> nd::Array1<f64> { j.projections().collect() }

/// Diagonal matrix with entries `f(m)`.
pub fn diag_fn<F>(j: SpinTotal, f: F) -> nd::Array2<C64>
where F: Fn(f64) -> f64
{
    let diag: nd::Array1<C64>
        = j.projections().map(|m| C64::from(f(m))).collect();
    nd::Array2::from_diag(&diag)
}

/// `Jz`.
pub fn jz(j: SpinTotal) -> nd::Array2<C64> { diag_fn(j, |m| m) }

/// `J+`, with `⟨m + 1|J+|m⟩ = sqrt((J - m)(J + m + 1))` on the sub-diagonal.
pub fn jplus(j: SpinTotal) -> nd::Array2<C64> {
    let n = j.num_states();
    let jf = j.f();
    let mut J: nd::Array2<C64> = nd::Array2::zeros((n, n));
    j.projections().take(n - 1).enumerate()
        .for_each(|(k, m)| {
            J[[k + 1, k]] = C64::from(((jf - m) * (jf + m + 1.0)).sqrt());
        });
    J
}

/// `J-`, the adjoint of [`jplus`].
pub fn jminus(j: SpinTotal) -> nd::Array2<C64> {
    adjoint(&jplus(j))
}

/// `Jx = (J+ + J-) / 2`.
pub fn jx(j: SpinTotal) -> nd::Array2<C64> {
    (jplus(j) + jminus(j)) * 0.5
}

/// `Jy = (J+ - J-) / 2i`.
pub fn jy(j: SpinTotal) -> nd::Array2<C64> {
    (jplus(j) - jminus(j)) * C64::new(0.0, -0.5)
}

/// `J² = J(J + 1)`, times the identity.
pub fn j2(j: SpinTotal) -> nd::Array2<C64> {
    let jj = j.jj();
    diag_fn(j, |_| jj)
}

/// Identity on the multiplet.
pub fn identity(j: SpinTotal) -> nd::Array2<C64> {
    nd::Array2::eye(j.num_states())
}

/// Conjugate transpose.
pub fn adjoint(a: &nd::Array2<C64>) -> nd::Array2<C64> {
    a.t().mapv(|x| x.conj())
}

/// Integer matrix power by repeated multiplication; `a⁰` is the identity.
pub fn matpow(a: &nd::Array2<C64>, p: u32) -> nd::Array2<C64> {
    let n = a.nrows();
    (0..p).fold(nd::Array2::eye(n), |acc, _| acc.dot(a))
}

/// Anticommutator `ab + ba`.
pub fn anticommutator(a: &nd::Array2<C64>, b: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    a.dot(b) + b.dot(a)
}

/// Return `true` if `a` equals its adjoint to within `tol` element-wise.
pub fn is_hermitian(a: &nd::Array2<C64>, tol: f64) -> bool {
    a.is_square()
        && a.iter().zip(a.t().iter())
            .all(|(aij, aji)| (*aij - aji.conj()).norm() <= tol)
}

/// Compute the outer product `|a⟩⟨b|` of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    let na = a.len();
    let nb = b.len();
    nd::Array2::from_shape_fn((na, nb), |(i, k)| a[i] * b[k].conj())
}

/// Basis vector `|m⟩` for the `k`-th projection number.
pub fn basis_vector(j: SpinTotal, k: usize) -> Option<nd::Array1<C64>> {
    let n = j.num_states();
    (k < n).then(|| {
        (0..n).map(|i| if i == k { C64::one() } else { C64::zero() })
            .collect()
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: &nd::Array2<C64>, b: &nd::Array2<C64>) -> bool {
        a.shape() == b.shape()
            && a.iter().zip(b).all(|(x, y)| (*x - *y).norm() < 1e-12)
    }

    #[test]
    fn commutation() {
        for halves in 1..8 {
            let j = SpinTotal::new(halves);
            let x = jx(j);
            let y = jy(j);
            let comm = x.dot(&y) - y.dot(&x);
            assert!(close(&comm, &(jz(j) * C64::i())));
        }
    }

    #[test]
    fn casimir() {
        let j = SpinTotal::new(5);
        let x = jx(j);
        let y = jy(j);
        let z = jz(j);
        let sum = x.dot(&x) + y.dot(&y) + z.dot(&z);
        assert!(close(&sum, &j2(j)));
    }

    #[test]
    fn raising_layout() {
        let j = SpinTotal::integer(1);
        let p = jplus(j);
        let s2 = 2.0_f64.sqrt();
        assert!((p[[1, 0]].re - s2).abs() < 1e-12);
        assert!((p[[2, 1]].re - s2).abs() < 1e-12);
        assert_eq!(p[[0, 1]], C64::zero());
        assert!(is_hermitian(&jx(j), 1e-14));
        assert!(!is_hermitian(&p, 1e-14));
    }

    #[test]
    fn powers() {
        let j = SpinTotal::integer(1);
        let p = jplus(j);
        assert!(close(&matpow(&p, 0), &identity(j)));
        assert!(close(&matpow(&p, 3), &nd::Array2::zeros((3, 3))));
    }
}
