//! Total angular-momentum quantum numbers.

use std::{ fmt, str::FromStr, sync::OnceLock };
use regex::Regex;
use crate::error::{ Error, Result };

/// A single total angular-momentum quantum number `J`.
///
/// This type is backed by a single `u32` representing the number of halves, so
/// that both integer and half-integer multiplets are exact.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpinTotal(u32);

impl SpinTotal {
    /// Create a new total spin from a number of halves.
    pub fn new(halves: u32) -> Self { Self(halves) }

    /// Create a new integer total spin.
    pub fn integer(j: u32) -> Self { Self(2 * j) }

    /// Return `self` as a bare number of halves.
    pub fn halves(self) -> u32 { self.0 }

    /// Return `self` as an `f64`.
    ///
    /// This reflects the "true" numerical value of the quantum number; i.e.
    /// there is a relative factor of 2 between this and [`Self::halves`].
    pub fn f(self) -> f64 { f64::from(self.0) / 2.0 }

    /// Create a new total-spin quantum number from a `f64` value, rounding
    /// to the nearest half-integer.
    ///
    /// Negative inputs are passed through [`f64::abs`] before rounding.
    pub fn from_f64(f: f64) -> Self { Self((2.0 * f.abs()).round() as u32) }

    /// Return `true` if `J` is an integer.
    pub fn is_integer(self) -> bool { self.0 % 2 == 0 }

    /// Return `floor(J)`.
    pub fn floor(self) -> u32 { self.0 / 2 }

    /// Return `J(J + 1)`.
    pub fn jj(self) -> f64 {
        let j = self.f();
        j * (j + 1.0)
    }

    /// Size of the multiplet, `2J + 1`.
    pub fn num_states(self) -> usize { self.0 as usize + 1 }

    /// Return an iterator over projection numbers `m = -J, ..., J` in
    /// ascending order, i.e. the order of the matrix basis.
    pub fn projections(self) -> Projections {
        Projections { halves: self.0, k: 0 }
    }
}

impl From<SpinTotal> for f64 {
    fn from(j: SpinTotal) -> Self { j.f() }
}

impl fmt::Display for SpinTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}/2", self.0)
        }
    }
}

fn spin_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([0-9]+)(?:(/2)|(\.[05]0*))?\s*$").ok()
    })
    .as_ref()
}

impl FromStr for SpinTotal {
    type Err = Error;

    /// Parse `"7"`, `"15/2"` or `"7.5"`.
    fn from_str(s: &str) -> Result<Self> {
        let caps = spin_pattern()
            .and_then(|pat| pat.captures(s))
            .ok_or_else(|| Error::InvalidSpin(s.to_string()))?;
        let n: u32 = caps[1].parse()
            .map_err(|_| Error::InvalidSpin(s.to_string()))?;
        if caps.get(2).is_some() {
            Ok(Self(n))
        } else if let Some(frac) = caps.get(3) {
            let half = u32::from(frac.as_str().starts_with(".5"));
            Ok(Self(2 * n + half))
        } else {
            Ok(Self(2 * n))
        }
    }
}

/// Iterator over the projection numbers of a multiplet in ascending order.
#[derive(Copy, Clone, Debug)]
pub struct Projections {
    halves: u32,
    k: u32,
}

impl Iterator for Projections {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        (self.k <= self.halves).then(|| {
            let m = f64::from(self.k) - f64::from(self.halves) / 2.0;
            self.k += 1;
            m
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.halves + 1).saturating_sub(self.k) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Projections { }
