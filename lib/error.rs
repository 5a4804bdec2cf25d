//! Error type shared by all parts of the crate.

use thiserror::Error;

/// Everything that can go wrong while configuring or evaluating a system.
///
/// Configuration errors are returned by the mutating call that received the
/// bad input, before any state is changed. Dimension mismatches are returned at
/// the point where the offending matrix is used.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported symmetry string {0:?}")]
    InvalidSymmetry(String),

    #[error("unsupported orbital {0:?}")]
    InvalidOrbital(String),

    #[error("invalid angular momentum quantum number {0:?}")]
    InvalidSpin(String),

    #[error("wrong number of crystal-field coefficients: expected {expected}, got {got}")]
    CoefficientCount { expected: usize, got: usize },

    #[error("Stevens operator O({rank}, {q}) is not implemented")]
    UnsupportedOperator { rank: u32, q: i32 },

    #[error("Stevens operator O({rank}, {q}) is not allowed by the current symmetry")]
    NotInBasis { rank: u32, q: i32 },

    #[error("subspace tag {0:?} already in use")]
    DuplicateTag(String),

    #[error("no subspace {0:?}")]
    UnknownSubspace(String),

    #[error("no term at index {0}")]
    NoTerm(usize),

    #[error("system has no states")]
    EmptySystem,

    #[error("matrix dimension mismatch: expected {expected}x{expected}, got {}x{}", got.0, got.1)]
    DimensionMismatch { expected: usize, got: (usize, usize) },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("linear algebra error: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Return a [`Error::DimensionMismatch`] unless `shape` is `n × n`.
pub(crate) fn check_square(n: usize, shape: &[usize]) -> Result<()> {
    match shape {
        [r, c] if *r == n && *c == n => Ok(()),
        [r, c] => Err(Error::DimensionMismatch { expected: n, got: (*r, *c) }),
        _ => Err(Error::DimensionMismatch { expected: n, got: (0, 0) }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dimension_message() {
        let err = check_square(3, &[3, 4]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "matrix dimension mismatch: expected 3x3, got 3x4",
        );
        assert!(check_square(3, &[3, 3]).is_ok());
    }

    #[test]
    fn coefficient_count_message() {
        let err = Error::CoefficientCount { expected: 2, got: 5 };
        assert!(err.to_string().contains("expected 2, got 5"));
    }
}
