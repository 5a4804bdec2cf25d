//! Time-reversal symmetry on a single multiplet.
//!
//! The antiunitary time-reversal operator is written `Θ = T K`, with `K`
//! complex conjugation in the `|m⟩` basis and `T` the unitary matrix returned
//! by [`time_reversal`].

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::spin::SpinTotal;

/// Unitary part `T` of the time-reversal operator.
///
/// `T` maps `|m⟩` to `|-m⟩` with alternating signs; its entries are `±1` for
/// integer `J` and `±i` for half-integer `J`, so that `T T* = +1` and `-1`
/// respectively.
pub fn time_reversal(j: SpinTotal) -> nd::Array2<C64> {
    let n = j.num_states();
    let mut f: C64
        = if j.is_integer() {
            if j.floor() % 2 == 0 { C64::from(1.0) } else { C64::from(-1.0) }
        } else if j.floor() % 2 == 0 {
            C64::i()
        } else {
            -C64::i()
        };
    let mut T: nd::Array2<C64> = nd::Array2::zeros((n, n));
    for i in 0..n {
        T[[n - i - 1, i]] = f;
        f = -f;
    }
    T
}

/// Time-reverse every column of `X`, i.e. compute `conj(T X)`.
pub fn time_inverse(X: &nd::Array2<C64>) -> nd::Array2<C64> {
    let j = SpinTotal::new(X.nrows().saturating_sub(1) as u32);
    time_reversal(j).dot(X).mapv(|x| x.conj())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        operators::{ adjoint, jx, jz },
        stevens::stevens,
    };

    fn close(a: &nd::Array2<C64>, b: &nd::Array2<C64>) -> bool {
        a.iter().zip(b).all(|(x, y)| (*x - *y).norm() < 1e-9)
    }

    // Θ A Θ⁻¹ = T A* T†
    fn reversed(j: SpinTotal, A: &nd::Array2<C64>) -> nd::Array2<C64> {
        let T = time_reversal(j);
        T.dot(&A.mapv(|x| x.conj())).dot(&adjoint(&T))
    }

    #[test]
    fn square_sign() {
        for halves in 0..9 {
            let j = SpinTotal::new(halves);
            let T = time_reversal(j);
            let TT = T.dot(&T.mapv(|x| x.conj()));
            let sign = if j.is_integer() { 1.0 } else { -1.0 };
            let eye: nd::Array2<C64> = nd::Array2::eye(j.num_states());
            assert!(close(&TT, &(eye * C64::from(sign))), "J = {}", j);
        }
    }

    #[test]
    fn angular_momentum_is_odd() {
        let j = SpinTotal::new(5);
        assert!(close(&reversed(j, &jz(j)), &(-jz(j))));
        assert!(close(&reversed(j, &jx(j)), &(-jx(j))));
    }

    #[test]
    fn stevens_are_even() {
        let j = SpinTotal::new(7);
        for (rank, q) in [(2, 0), (2, -2), (4, 3), (4, -1), (6, 6)] {
            let O = stevens(j, rank, q, false).unwrap();
            assert!(close(&reversed(j, &O), &O), "O({}, {})", rank, q);
        }
    }

    #[test]
    fn inverse_of_basis() {
        let j = SpinTotal::integer(1);
        let X: nd::Array2<C64> = nd::Array2::eye(3);
        let Y = time_inverse(&X);
        // |m = -1⟩ -> -|m = +1⟩ for J = 1
        assert!((Y[[2, 0]] + 1.0).norm() < 1e-12);
        assert!((Y[[1, 1]] - 1.0).norm() < 1e-12);
        assert_eq!(Y.nrows(), j.num_states());
    }
}
