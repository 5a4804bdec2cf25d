//! Closed-form Stevens operators `O_k^q` for ranks 2, 4, and 6.
//!
//! Cosine-type operators have `q > 0` and sine-type operators `q < 0`. Every
//! off-axial operator has the form
//! ```text
//! O_k^{+q} = [P(Jz), J+^q + J-^q]_+ / 4
//! O_k^{-q} = [P(Jz), J+^q - J-^q]_+ / 4i
//! ```
//! for a rank- and `|q|`-specific polynomial `P`; the axial operators `O_k^0`
//! are diagonal polynomials in `Jz`.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ Error, Result },
    operators::{ anticommutator, diag_fn, jminus, jplus, matpow },
    spin::SpinTotal,
};

/// Highest rank with an implemented operator.
pub const MAX_RANK: u32 = 6;

/// Return `true` if `O_rank^q` is implemented.
pub fn is_supported(rank: u32, q: i32) -> bool {
    matches!(rank, 2 | 4 | 6) && q.unsigned_abs() <= rank
}

// diagonal part of O_k^0 as a function of m and JJ = J(J + 1); the second
// element is the m-independent constant
fn axial_poly(rank: u32, m: f64, jj: f64) -> Option<(f64, f64)> {
    let m2 = m * m;
    match rank {
        2 => Some((3.0 * m2, -jj)),
        4 => Some((
            35.0 * m2 * m2 - 30.0 * jj * m2 + 25.0 * m2,
            3.0 * jj * jj - 6.0 * jj,
        )),
        6 => Some((
            231.0 * m2.powi(3)
                - 315.0 * jj * m2 * m2 + 735.0 * m2 * m2
                + 105.0 * jj * jj * m2 - 525.0 * jj * m2 + 294.0 * m2,
            -5.0 * jj.powi(3) + 40.0 * jj * jj - 60.0 * jj,
        )),
        _ => None,
    }
}

// the P(Jz) factor of the off-axial operators
fn ladder_poly(rank: u32, q: u32, m: f64, jj: f64) -> Option<f64> {
    let m2 = m * m;
    match (rank, q) {
        (2, 1) => Some(m),
        (2, 2) => Some(1.0),
        (4, 1) => Some(7.0 * m2 * m - (3.0 * jj + 1.0) * m),
        (4, 2) => Some(7.0 * m2 - jj - 5.0),
        (4, 3) => Some(m),
        (4, 4) => Some(1.0),
        (6, 1) => Some(
            33.0 * m2 * m2 * m
            - (30.0 * jj - 15.0) * m2 * m
            + (5.0 * jj * jj - 10.0 * jj + 12.0) * m
        ),
        (6, 2) => Some(
            33.0 * m2 * m2 - (18.0 * jj + 123.0) * m2
            + jj * jj + 10.0 * jj + 102.0
        ),
        (6, 3) => Some(11.0 * m2 * m - 3.0 * jj * m - 59.0 * m),
        (6, 4) => Some(11.0 * m2 - jj - 38.0),
        (6, 5) => Some(m),
        (6, 6) => Some(1.0),
        _ => None,
    }
}

/// Compute the Stevens operator `O_rank^q` on the multiplet `j`.
///
/// If `no_constant_term` is `true`, the `m`-independent part of the axial
/// operators (`q = 0`) is dropped; the flag has no effect for `q != 0`.
pub fn stevens(j: SpinTotal, rank: u32, q: i32, no_constant_term: bool)
    -> Result<nd::Array2<C64>>
{
    if !is_supported(rank, q) {
        return Err(Error::UnsupportedOperator { rank, q });
    }
    let jj = j.jj();
    if q == 0 {
        return Ok(diag_fn(j, |m| {
            let (var, cst) = axial_poly(rank, m, jj).unwrap_or((0.0, 0.0));
            if no_constant_term { var } else { var + cst }
        }));
    }
    let qa = q.unsigned_abs();
    let P = diag_fn(j, |m| ladder_poly(rank, qa, m, jj).unwrap_or(0.0));
    let up = matpow(&jplus(j), qa);
    let dn = matpow(&jminus(j), qa);
    let O
        = if q > 0 {
            anticommutator(&P, &(up + dn)) * 0.25
        } else {
            anticommutator(&P, &(up - dn)) * C64::new(0.0, -0.25)
        };
    Ok(O)
}
